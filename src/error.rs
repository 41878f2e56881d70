/// Fatal conditions that abort a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    InvalidParams(String),
    LakeCapacity { capacity: usize },
    EmptyLakeQueue { x: usize, y: usize },
    MissingOutflow { x: usize, y: usize },
    RiverLoop { x: usize, y: usize },
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::InvalidParams(e) => write!(f, "Invalid parameters: {}", e),
            GenerationError::LakeCapacity { capacity } => {
                write!(f, "Lake table exhausted ({} lakes)", capacity)
            }
            GenerationError::EmptyLakeQueue { x, y } => {
                write!(f, "Lake growing from ({}, {}) ran out of frontier tiles", x, y)
            }
            GenerationError::MissingOutflow { x, y } => {
                write!(f, "River reached ({}, {}) which has no outflow", x, y)
            }
            GenerationError::RiverLoop { x, y } => {
                write!(f, "River starting at ({}, {}) never reached the sea", x, y)
            }
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<String> for GenerationError {
    fn from(e: String) -> Self {
        GenerationError::InvalidParams(e)
    }
}
