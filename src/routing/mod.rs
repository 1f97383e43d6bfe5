/*!
 * Per-segment translation routing.
 *
 * This module contains:
 * - `state`: the routing state machine and its pure transitions
 * - `decision`: translation candidates and routing decisions
 * - `router`: the router driving methods through the state machine
 * - `stats`: router counters
 */

pub mod decision;
pub mod router;
pub mod state;
pub mod stats;

pub use decision::{CandidateRole, FallbackReason, PASSTHROUGH_METHOD, RoutingDecision, TranslationCandidate};
pub use router::TranslationRouter;
pub use state::{RoutePolicy, RouteState, is_valid_trace};
pub use stats::{RouterStats, RouterStatsSnapshot};
