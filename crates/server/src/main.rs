use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;

use facemesh_stream_core::detection::infrastructure::extractor_factory::create_extractor;
use facemesh_stream_core::display::display_loop::DisplayLoop;
use facemesh_stream_core::display::infrastructure::headless_display::HeadlessDisplay;
use facemesh_stream_core::shared::cancellation::CancellationToken;
use facemesh_stream_core::shared::frame_buffer::FrameBuffer;
use facemesh_stream_core::transport::stream_server::StreamServer;
use facemesh_stream_server::cli::StreamArgs;

/// Streams face landmarks from a camera or video file to Socket.IO clients.
#[derive(Parser, Debug)]
#[command(name = "facemesh-stream")]
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
    log::info!(
        "Streaming {} to ws://{}/socket.io/",
        config.source,
        server.local_addr()
    );

    let snapshot_dir = config.snapshot_dir.clone();
    let snapshot_every = config.snapshot_every;
    let display_cancel = cancel.clone();
    let display = thread::Builder::new()
        .name("display".to_string())
        .spawn(move || {
            let mut display = HeadlessDisplay::new(snapshot_dir).with_interval(snapshot_every);
            DisplayLoop::new().run(&buffer, &mut display, &display_cancel)
        })?;

    let report = server.wait();
    if display.join().is_err() {
        log::error!("Display thread panicked");
    }

    match report.outcome {
        Some(Err(e)) => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemesh_stream_core::shared::video_source::VideoSource;

    #[test]
    fn test_stream_flags_are_accepted() {
        let cli = Cli::try_parse_from(["facemesh-stream", "--source", "2", "--snapshot-every", "10"])
            .unwrap();
        assert_eq!(cli.stream.source, Some(VideoSource::Device(2)));
        assert_eq!(cli.stream.snapshot_every, Some(10));
    }
}
