//! Standard locking-script recognition.

pub mod standard;

pub use standard::{classify_script_pubkey, p2pkh_script, p2sh_script, ScriptType};
