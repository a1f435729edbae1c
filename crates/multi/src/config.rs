/// Options controlling how strictly a composite is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    validate_dimensions: bool,
}

impl Default for Options {
    /// Strict validation.
    fn default() -> Self {
        Self {
            validate_dimensions: true,
        }
    }
}

impl Options {
    /// Creates options that skip dimension checks.
    ///
    /// Dimension mismatches between connected analog ports and event receive
    /// exposures that shadow an internal connection are logged as warnings
    /// instead of failing construction.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            validate_dimensions: false,
        }
    }

    /// Returns a copy with dimension validation switched on or off.
    #[must_use]
    pub fn with_validate_dimensions(self, validate_dimensions: bool) -> Self {
        Self {
            validate_dimensions,
        }
    }

    /// Returns whether findings are hard errors.
    #[must_use]
    pub fn validate_dimensions(&self) -> bool {
        self.validate_dimensions
    }
}
