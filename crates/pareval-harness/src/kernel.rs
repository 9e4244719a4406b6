//! Kernel and problem contracts.

use std::fmt;

use pareval_common::{Element, KernelError};

/// A transformation from an immutable input buffer to an output buffer.
///
/// Implementations must fully overwrite `output`, must not keep references
/// to either buffer past the call, and must be safe to call repeatedly.
/// Internal parallelism is allowed; the call must return only once the
/// output is complete.
pub trait Kernel<I, O>: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, input: &[I], output: &mut [O]) -> Result<(), KernelError>;
}

impl<I, O, K: Kernel<I, O> + ?Sized> Kernel<I, O> for Box<K> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, input: &[I], output: &mut [O]) -> Result<(), KernelError> {
        (**self).run(input, output)
    }
}

/// A [`Kernel`] backed by a closure.
pub struct FnKernel<F> {
    name: String,
    f: F,
}

impl<F> fmt::Debug for FnKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnKernel").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<I, O, F> Kernel<I, O> for FnKernel<F>
where
    F: Fn(&[I], &mut [O]) -> Result<(), KernelError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: &[I], output: &mut [O]) -> Result<(), KernelError> {
        (self.f)(input, output)
    }
}

/// Wrap a closure as a named kernel.
pub fn kernel_fn<I, O, F>(name: impl Into<String>, f: F) -> FnKernel<F>
where
    F: Fn(&[I], &mut [O]) -> Result<(), KernelError> + Send + Sync,
{
    FnKernel { name: name.into(), f }
}

/// One benchmark problem: element domains, input distribution, and the
/// trusted reference kernel that candidates are checked against.
pub trait Problem: Send + Sync {
    type Input: Element;
    type Output: Element;

    fn name(&self) -> &str;

    /// Bounds `[low, high)` random input is drawn from.
    fn input_bounds(&self) -> (Self::Input, Self::Input);

    /// Output length for an input of `input_len` elements.
    fn output_len(&self, input_len: usize) -> usize {
        input_len
    }

    fn reference(&self) -> &dyn Kernel<Self::Input, Self::Output>;
}
