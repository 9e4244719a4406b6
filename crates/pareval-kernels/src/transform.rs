//! Element-wise map from `i32` to a power-of-two mask.
//!
//! `[8, 0, 9, 7, 15, 64, 3]` maps to
//! `[true, false, false, false, false, true, false]`.

use pareval_common::KernelError;
use pareval_harness::{Kernel, Problem};
use rayon::prelude::*;

/// `true` for 1, 2, 4, 8, ...; zero and negatives are not powers of two.
#[inline]
pub fn is_power_of_two(x: i32) -> bool {
    x > 0 && x & (x - 1) == 0
}

/// Power-of-two mask over input drawn from `[1, 1025)`.
#[derive(Debug, Default)]
pub struct MapPowersOfTwo {
    reference: SerialMap,
}

impl MapPowersOfTwo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Problem for MapPowersOfTwo {
    type Input = i32;
    type Output = bool;

    fn name(&self) -> &str {
        "transform_map_function"
    }

    fn input_bounds(&self) -> (i32, i32) {
        (1, 1025)
    }

    fn reference(&self) -> &dyn Kernel<i32, bool> {
        &self.reference
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SerialMap;

impl Kernel<i32, bool> for SerialMap {
    fn name(&self) -> &str {
        "serial_map"
    }

    fn run(&self, input: &[i32], output: &mut [bool]) -> Result<(), KernelError> {
        KernelError::check_len(input.len(), output.len())?;
        for (m, &x) in output.iter_mut().zip(input) {
            *m = is_power_of_two(x);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelMap;

impl Kernel<i32, bool> for ParallelMap {
    fn name(&self) -> &str {
        "parallel_map"
    }

    fn run(&self, input: &[i32], output: &mut [bool]) -> Result<(), KernelError> {
        KernelError::check_len(input.len(), output.len())?;
        output.par_iter_mut().zip(input.par_iter()).for_each(|(m, &x)| *m = is_power_of_two(x));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_of_two() {
        let hits: Vec<i32> = (-4..=1025).filter(|&x| is_power_of_two(x)).collect();
        assert_eq!(hits, vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024]);
        assert!(!is_power_of_two(i32::MIN));
        assert!(is_power_of_two(1 << 30));
    }

    #[test]
    fn map_example() {
        let input = [8, 0, 9, 7, 15, 64, 3];
        let expected = [true, false, false, false, false, true, false];
        let mut serial = [false; 7];
        let mut parallel = [true; 7];
        SerialMap.run(&input, &mut serial).unwrap();
        ParallelMap.run(&input, &mut parallel).unwrap();
        assert_eq!(serial, expected);
        assert_eq!(parallel, expected);
    }
}
