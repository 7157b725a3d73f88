use thiserror::Error;

#[derive(Debug, Error)]
pub enum GbrtError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    #[error("Feature index {0} is out of bounds for a matrix with {1} features.")]
    FeatureOutOfBounds(u32, usize),
    #[error("Number of instances {0} exceeds the supported maximum of {1}.")]
    TooManyInstances(usize, u32),
    #[error("Gradient, hessian and matrix row counts disagree: {0}, {1} and {2}.")]
    DimensionMismatch(usize, usize, usize),
    #[error("Matrix has {0} features but the configuration expects {1}.")]
    FeatureCountMismatch(usize, u32),
    #[error("Group id {0} at instance {1} exceeds the number of roots {2}.")]
    GroupOutOfRange(u32, usize, u32),
    #[error("Expected one group id per instance, got {0} for {1} instances.")]
    GroupLengthMismatch(usize, usize),
}
