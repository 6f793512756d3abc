use crate::error::MlError;
use nalgebra::DVector;

/// A radial basis function parameterised by the squared radius.
///
/// `gradient` and `second_derivative` are derivatives with respect to the
/// squared radius, not the radius.
pub trait RadialBasisFunction {
    fn value(&self, squared_radius: f64) -> Result<f64, MlError>;

    fn gradient(&self, squared_radius: f64) -> Result<f64, MlError>;

    fn second_derivative(&self, squared_radius: f64) -> Result<f64, MlError>;
}

/// The Gaussian radial basis function `exp(-r^2)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GaussianRbf;

impl RadialBasisFunction for GaussianRbf {
    fn value(&self, squared_radius: f64) -> Result<f64, MlError> {
        check_squared_radius(squared_radius)?;
        Ok((-squared_radius).exp())
    }

    fn gradient(&self, squared_radius: f64) -> Result<f64, MlError> {
        check_squared_radius(squared_radius)?;
        Ok(-(-squared_radius).exp())
    }

    fn second_derivative(&self, squared_radius: f64) -> Result<f64, MlError> {
        check_squared_radius(squared_radius)?;
        Ok((-squared_radius).exp())
    }
}

fn check_squared_radius(squared_radius: f64) -> Result<(), MlError> {
    if squared_radius < 0.0 {
        return Err(MlError::invalid_input(
            "The squared radius must be greater than or equal to 0.",
        ));
    }
    Ok(())
}

/// A kernel over fixed-dimension vectors built from a radial basis function,
/// `K(x1, x2) = rbf(|x1 - x2|^2)`.
#[derive(Clone, Debug)]
pub struct RbfKernel<R: RadialBasisFunction> {
    rbf: R,
    dim: usize,
}

impl<R: RadialBasisFunction> RbfKernel<R> {
    pub fn new(rbf: R, dim: usize) -> Result<Self, MlError> {
        if dim == 0 {
            return Err(MlError::invalid_input(
                "The kernel dimension must be greater than 0.",
            ));
        }
        Ok(Self { rbf, dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn value(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> Result<f64, MlError> {
        self.check_dim(x1)?;
        self.check_dim(x2)?;
        self.rbf.value((x1 - x2).norm_squared())
    }

    /// Gradient of the kernel value with respect to `x1`.
    pub fn gradient(&self, x1: &DVector<f64>, x2: &DVector<f64>) -> Result<DVector<f64>, MlError> {
        self.check_dim(x1)?;
        self.check_dim(x2)?;
        let diff = x1 - x2;
        let radial_gradient = self.rbf.gradient(diff.norm_squared())?;
        Ok(diff * (2.0 * radial_gradient))
    }

    fn check_dim(&self, x: &DVector<f64>) -> Result<(), MlError> {
        if x.len() != self.dim {
            return Err(MlError::DimensionMismatch {
                expected: self.dim,
                found: x.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Squares the squared radius, which keeps the expected kernel values and
    // gradients exact.
    struct SquaredRbf;

    impl RadialBasisFunction for SquaredRbf {
        fn value(&self, squared_radius: f64) -> Result<f64, MlError> {
            check_squared_radius(squared_radius)?;
            Ok(squared_radius * squared_radius)
        }

        fn gradient(&self, squared_radius: f64) -> Result<f64, MlError> {
            check_squared_radius(squared_radius)?;
            Ok(2.0 * squared_radius)
        }

        fn second_derivative(&self, squared_radius: f64) -> Result<f64, MlError> {
            check_squared_radius(squared_radius)?;
            Ok(2.0)
        }
    }

    #[test]
    fn test_gaussian_rbf() {
        let rbf = GaussianRbf;

        assert_relative_eq!(rbf.value(0.0).unwrap(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(rbf.value(1.0).unwrap(), (-1.0f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(rbf.gradient(1.0).unwrap(), -(-1.0f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(
            rbf.second_derivative(1.0).unwrap(),
            (-1.0f64).exp(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_negative_squared_radius_rejected() {
        let rbf = GaussianRbf;

        assert!(rbf.value(-0.5).is_err());
        assert!(rbf.gradient(-0.5).is_err());
        assert!(rbf.second_derivative(-0.5).is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(RbfKernel::new(GaussianRbf, 0).is_err());
    }

    #[test]
    fn test_kernel_value() {
        let kernel = RbfKernel::new(SquaredRbf, 2).unwrap();
        let x1 = DVector::from_vec(vec![-1.0, 1.0]);
        let x2 = DVector::from_vec(vec![1.0, 1.0]);

        assert_relative_eq!(kernel.value(&x1, &x2).unwrap(), 16.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.value(&x1, &x1).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kernel_gradient_matches_the_chain_rule() {
        let kernel = RbfKernel::new(SquaredRbf, 2).unwrap();
        let x1 = DVector::from_vec(vec![-1.0, 1.0]);
        let x2 = DVector::from_vec(vec![1.0, 1.0]);

        let gradient = kernel.gradient(&x1, &x2).unwrap();
        assert_relative_eq!(gradient[0], -32.0, epsilon = 1e-12);
        assert_relative_eq!(gradient[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kernel_dimension_mismatch() {
        let kernel = RbfKernel::new(GaussianRbf, 2).unwrap();
        let x1 = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let x2 = DVector::from_vec(vec![1.0, 2.0]);

        let result = kernel.value(&x1, &x2);
        assert!(matches!(
            result,
            Err(MlError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_gaussian_kernel_is_one_at_zero_distance() {
        let kernel = RbfKernel::new(GaussianRbf, 3).unwrap();
        let x = DVector::from_vec(vec![0.5, -0.5, 2.0]);

        assert_relative_eq!(kernel.value(&x, &x).unwrap(), 1.0, epsilon = 1e-15);
    }
}
