pub mod note_event_commands;
pub mod session_commands;
