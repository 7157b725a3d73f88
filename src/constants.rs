/// Minimum loss change required before a node is converted to a split.
/// Also the offset applied to terminal split thresholds so that the
/// boundary cell routes correctly under strict `<` comparison.
pub const RT_EPS: f32 = 1e-5;
/// Minimum gap between two consecutive feature values for the point
/// between them to be considered as a split threshold.
pub const RT_2EPS: f32 = RT_EPS * 2.0;
