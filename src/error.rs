//! Error types for the water pipeline and the OpenGL side of the crate.
//!
//! Nothing here covers the "no overlap" case: a camera that does not see the slab is an ordinary
//! frame and is reported as `None`, not as an error.

/// Failures of the geometry pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WaterError {
    /// The ray through a grid corner runs parallel to the water base plane, so the corner has no
    /// world position. The frame should be skipped rather than drawn degenerate.
    #[error("grid corner ({u}, {v}) does not project onto the water base plane")]
    CornerMissedPlane { u: f32, v: f32 },

    #[error("{0} matrix is not invertible")]
    SingularMatrix(&'static str),

    #[error("invalid water configuration: {0}")]
    InvalidConfig(String),
}

impl WaterError {
    pub fn invalid_config<T: ToString>(msg: T) -> Self {
        WaterError::InvalidConfig(msg.to_string())
    }
}

/// Failures while creating or driving the OpenGL context.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("could not create the OpenGL context: {0}")]
    Creation(#[from] glutin::CreationError),

    #[error("OpenGL context error: {0}")]
    Context(#[from] glutin::ContextError),

    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("shader program failed to link: {0}")]
    ProgramLink(String),

    /// `glGen*` handed back a zero name.
    #[error("could not allocate OpenGL {0}")]
    Resource(&'static str),

    #[error(transparent)]
    Water(#[from] WaterError),
}

pub type WaterResult<T> = Result<T, WaterError>;

pub type RenderResult<T> = Result<T, RenderError>;
