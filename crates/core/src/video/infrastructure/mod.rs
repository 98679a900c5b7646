pub mod ffmpeg_reader;
pub mod reader_factory;
pub mod still_image_reader;
