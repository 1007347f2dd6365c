use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpanlensError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SpanlensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_layer() {
        assert_eq!(
            SpanlensError::Config("bad palette".into()).to_string(),
            "configuration error: bad palette"
        );
        assert_eq!(
            SpanlensError::Parse("invalid where filter: x".into()).to_string(),
            "parse error: invalid where filter: x"
        );
    }
}
