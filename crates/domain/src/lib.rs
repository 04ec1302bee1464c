pub mod confidence;
pub mod person;
pub mod relationship;
pub mod request;
pub mod resolution;
pub mod session;
pub mod social;

pub use confidence::{ConfidenceSignals, MatchCertainty};
pub use person::{ParentName, Person};
pub use relationship::{CandidateRelationship, RelationshipContext};
pub use request::{
    AgePreference, AiHint, ParseRequestContext, ParseResult, ParsedRequest, RequestMetadata,
    RequestSource, RequestType, ResolutionTarget,
};
pub use resolution::{ResolutionMetadata, ResolutionResult};
pub use session::{AttendeeInfo, Session, SessionType};
pub use social::SocialSignals;
