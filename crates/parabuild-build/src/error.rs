use parabuild_core::PlanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid build plan: {0}")]
    Plan(#[from] PlanError),

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run command: {program} {}", describe_exit(.code))]
    CommandFailed { program: String, code: Option<i32> },

    #[error("failed to read output of {program}: {source}")]
    Output {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("failed to build image {image}: {source}")]
    ArchBuild {
        image: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("failed to publish manifest {tag}: {source}")]
    Manifest {
        tag: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("image {image}: {source}")]
    Image {
        image: String,
        #[source]
        source: Box<BuildError>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl BuildError {
    /// Innermost error, looking through the per-level wrappers
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::ArchBuild { source, .. }
            | BuildError::Manifest { source, .. }
            | BuildError::Image { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True when the failure only reflects a cancellation triggered elsewhere
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), BuildError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
