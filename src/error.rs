pub type StorycutResult<T> = Result<T, StorycutError>;

#[derive(thiserror::Error, Debug)]
pub enum StorycutError {
    #[error("script error: {0}")]
    Script(String),

    #[error("script contains no segments")]
    EmptyScript,

    #[error("no renderable content: {0}")]
    NoRenderableContent(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorycutError {
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    pub fn no_renderable_content(msg: impl Into<String>) -> Self {
        Self::NoRenderableContent(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
