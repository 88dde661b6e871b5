/// Process-level failure with the exit code `main` should return.
///
/// Per-fit problems are never reported through this type: they are fit states
/// (see `domain::FitState`) and are aggregated as data.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    /// Invalid configuration, malformed request or failed I/O.
    pub const INVALID_INPUT: u8 = 2;
    /// Nothing to fit.
    pub const EMPTY_DATA: u8 = 3;
    /// Numerical or backend failure.
    pub const COMPUTE: u8 = 4;

    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_INPUT, message)
    }

    pub fn compute(message: impl Into<String>) -> Self {
        Self::new(Self::COMPUTE, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_set_exit_codes() {
        assert_eq!(AppError::invalid_input("bad").exit_code(), 2);
        assert_eq!(AppError::compute("nan").exit_code(), 4);
        assert_eq!(AppError::new(AppError::EMPTY_DATA, "x").exit_code(), 3);
        assert_eq!(AppError::compute("nan").to_string(), "nan");
    }
}
