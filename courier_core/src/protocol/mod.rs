/*!
 * Protocol layer: what goes on the wire.
 *
 * - `constants`: fixed header values, default timeouts
 * - `headers`: header finalization for a single request, URL checks
 */

pub mod constants;
pub mod headers;
