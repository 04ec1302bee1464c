//! Session-scoped social graphs over family, school, and bunk enrollment
//! data, used purely as an informational signal for confidence scoring and
//! name disambiguation — never to originate bunk requests of its own.

pub mod relationship;
pub mod relationship_type;
pub mod signals_adapter;
pub mod smart_resolver;
pub mod social_graph;

pub use relationship::RelationshipAnalyzer;
pub use relationship_type::{relationship_weight, RelationshipType};
pub use smart_resolver::SmartResolver;
pub use social_graph::{EdgeData, FriendGroup, GraphError, GraphStats, SocialGraph};
