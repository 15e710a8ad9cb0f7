// Validation errors surfaced to the operator and to gateway callers
//
// Display strings are what ends up in the error banner and in
// ActionResponse.error, so they are worded for humans.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("title is required")]
    TitleRequired,
    #[error("title cannot be empty")]
    TitleEmpty,
    #[error("title cannot be longer than {0} characters")]
    TitleTooLong(usize),
    #[error("instance limit reached ({0})")]
    InstanceLimit(usize),
    #[error("you can't create more than {0} instances")]
    TooManyInstances(usize),
    #[error("instance {0:?} already exists")]
    AlreadyExists(String),
    #[error("instance {0:?} not found")]
    NotFound(String),
    #[error("instance {0:?} is not running")]
    NotRunning(String),
    #[error("instance {0:?} is already paused")]
    AlreadyPaused(String),
    #[error("instance {0:?} is not paused")]
    NotPaused(String),
    #[error("instance {0:?} is busy with another operation")]
    Busy(String),
    #[error("target is required")]
    TargetRequired,
    #[error("to and content are required")]
    InjectParamsRequired,
    #[error("instance {0} is currently checked out")]
    CheckedOut(String),
    #[error("cannot move instances in shared-worktree topics")]
    SharedTopicMove,
    #[error("select a topic first")]
    NoTopicSelected,
    #[error("topic name cannot be empty")]
    TopicNameEmpty,
    #[error("topic {0:?} already exists")]
    TopicExists(String),
    #[error("unknown action type: {0}")]
    UnknownAction(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
}
