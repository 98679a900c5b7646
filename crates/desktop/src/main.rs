mod viewer;

use std::process;
use std::sync::Arc;

use clap::Parser;

use facemesh_stream_core::detection::infrastructure::extractor_factory::create_extractor;
use facemesh_stream_core::shared::cancellation::CancellationToken;
use facemesh_stream_core::shared::constants::WINDOW_TITLE;
use facemesh_stream_core::shared::frame_buffer::FrameBuffer;
use facemesh_stream_core::transport::stream_server::StreamServer;
use facemesh_stream_server::cli::StreamArgs;

use viewer::Viewer;

/// Streams face landmarks to Socket.IO clients and previews the annotated
/// frames in a window. Press `q` to quit.
#[derive(Parser, Debug)]
#[command(name = "facemesh-stream-desktop")]
struct Cli {
    #[command(flatten)]
    stream: StreamArgs,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().stream.into_config()?;

    let extractor = create_extractor(&config.models)?;
    let buffer = Arc::new(FrameBuffer::new(config.buffer_capacity));
    let cancel = CancellationToken::new();
    let server = StreamServer::start(&config, extractor, buffer.clone(), cancel.clone())?;

    let window_cancel = cancel.clone();
    let result = iced::application(
        move || (Viewer::new(buffer.clone(), window_cancel.clone()), iced::Task::none()),
        Viewer::update,
        Viewer::view,
    )
    .title(WINDOW_TITLE)
    .subscription(Viewer::subscription)
    .window(iced::window::Settings {
        size: iced::Size::new(960.0, 720.0),
        ..Default::default()
    })
    .run();

    // Closing the window ends the process like a quit key does.
    cancel.cancel();
    let report = server.shutdown();
    result?;
    match report.outcome {
        Some(Err(e)) => Err(e.into()),
        _ => Ok(()),
    }
}
