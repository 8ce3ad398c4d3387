mod scripted;

pub use scripted::{ScriptStep, ScriptedAdapter};
