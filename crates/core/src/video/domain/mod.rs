pub mod looping_reader;
pub mod video_reader;
