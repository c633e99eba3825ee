pub mod note_queries;
