/*!
 * Sandbox Limits and Constants
 *
 * Centralized location for protocol constants, thresholds, and magic strings.
 * Organized by the side of the boundary that uses them.
 *
 * - Wire-visible constants are marked with [WIRE]
 * - Isolation-critical constants are marked with [ISOLATION]
 */

use std::time::Duration;

// =============================================================================
// ISOLATED CONTEXT
// =============================================================================

/// Id of the element every mounted instance renders into
pub const DEFAULT_MOUNT_POINT_ID: &str = "app";

/// Marker carried by the stylesheet an `eval` cycle injects
/// [ISOLATION] Only elements carrying it are removed by the next cycle
pub const STYLE_MARKER: &str = "data-sandbox-runner";

/// Maximum nesting followed when pretty-printing console arguments
/// Deeper (or circular) structures fall back to string conversion
pub const MAX_SERIALIZE_DEPTH: usize = 64;

/// Maximum nesting followed by the static runtime when rendering components
pub const MAX_RENDER_DEPTH: usize = 32;

/// Deferred jobs drained per loop turn
/// Jobs scheduled beyond this run on the next turn
pub const MAX_JOBS_PER_TURN: usize = 1024;

/// Prefix of the error message reported for a failed deferred job
/// [WIRE]
pub const UNHANDLED_REJECTION_PREFIX: &str = "Unhandled Promise Rejection: ";

/// Message reported when an error payload carries no message
/// [WIRE]
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

// =============================================================================
// CONTROLLER
// =============================================================================

/// Thread name prefix for isolated contexts
pub const CONTEXT_THREAD_PREFIX: &str = "sandbox-context";

/// Thread name prefix for controller message listeners
pub const LISTENER_THREAD_PREFIX: &str = "sandbox-listener";

/// Evaluations slower than this are logged as warnings
pub const SLOW_EVAL_THRESHOLD: Duration = Duration::from_millis(100);
