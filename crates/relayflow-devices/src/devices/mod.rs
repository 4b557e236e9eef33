/*!
 * Concrete device implementations.
 *
 * This module contains the remote-switch device variants shipped with
 * relayflow.
 */

pub mod remote_socket;

pub use remote_socket::{RemoteSocketA, RemoteSocketB, RemoteSocketC};
