use crate::shared::frame::{Frame, PixelOrder};
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::video_source::VideoSource;
use crate::video::domain::video_reader::{VideoError, VideoReader};

/// Decodes video files and capture devices via ffmpeg-next.
///
/// Every decoded frame is converted to RGB24 and wrapped in a [`Frame`].
/// Devices are opened through the platform capture demuxer
/// (`video4linux2` on Linux, `avfoundation` on macOS, `dshow` on Windows).
pub struct FfmpegReader {
    stream: Option<OpenStream>,
    source: Option<VideoSource>,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

struct OpenStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            stream: None,
            source: None,
            frame_index: 0,
            flushing: false,
            done: false,
        }
    }

    fn reset_position(&mut self) {
        self.frame_index = 0;
        self.flushing = false;
        self.done = false;
    }

    fn reopen(&mut self) -> Result<(), VideoError> {
        let source = self.source.clone().ok_or(VideoError::NotOpened)?;
        self.stream = None;
        self.open(&source).map(|_| ())
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(VideoError::NotOpened);
        };
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if stream.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        stream
            .scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| VideoError::Decode(e.to_string()))?;

        let pixels = extract_rgb_pixels(&rgb_frame, stream.width, stream.height);
        let frame = Frame::new(pixels, stream.width, stream.height, 3, self.frame_index)
            .with_order(PixelOrder::Rgb);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, VideoError> {
        let unavailable = |e: &dyn std::fmt::Display| VideoError::unavailable(source, e);

        ffmpeg_next::init().map_err(|e| unavailable(&e))?;
        let ictx = open_input(source).map_err(|e| unavailable(&e))?;

        let (video_stream_index, fps, total_frames, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| unavailable(&"no video stream found"))?;
            let rate = stream.rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };
            (
                stream.index(),
                fps,
                stream.frames().max(0) as usize,
                stream.parameters(),
            )
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(parameters)
            .map_err(|e| unavailable(&e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| unavailable(&e))?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| unavailable(&e))?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: source.clone(),
        };

        self.stream = Some(OpenStream {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
        });
        self.source = Some(source.clone());
        self.reset_position();

        Ok(metadata)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.stream.is_none() {
            return Err(VideoError::NotOpened);
        }
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Err(VideoError::NotOpened);
            };
            let next = stream
                .ictx
                .packets()
                .next()
                .map(|(packet_stream, packet)| (packet_stream.index(), packet));

            let Some((stream_index, packet)) = next else {
                let _ = stream.decoder.send_eof();
                self.flushing = true;
                if let Some(frame) = self.try_receive()? {
                    return Ok(Some(frame));
                }
                self.done = true;
                return Ok(None);
            };

            if stream_index != stream.video_stream_index {
                continue;
            }

            // Corrupt packets are skipped, as players do.
            if stream.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn rewind(&mut self) -> Result<(), VideoError> {
        if self.stream.is_none() {
            return Err(VideoError::NotOpened);
        }
        if matches!(self.source, Some(VideoSource::Device(_))) {
            return self.reopen();
        }

        let seeked = self.stream.as_mut().map(|stream| {
            stream.ictx.seek(0, ..).map(|()| stream.decoder.flush())
        });
        match seeked {
            Some(Ok(())) => {
                self.reset_position();
                Ok(())
            }
            Some(Err(e)) => {
                log::debug!("Seek to start failed ({e}), reopening source");
                self.reopen()
            }
            None => Err(VideoError::NotOpened),
        }
    }

    fn close(&mut self) {
        self.stream = None;
        self.reset_position();
    }
}

fn open_input(
    source: &VideoSource,
) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    match source {
        VideoSource::File(path) => ffmpeg_next::format::input(path),
        VideoSource::Device(index) => {
            ffmpeg_next::device::register_all();
            let (demuxer, url) = capture_device(*index)?;
            let format = ffmpeg_next::device::input::video()
                .find(|f| f.name() == demuxer)
                .ok_or(ffmpeg_next::Error::DemuxerNotFound)?;
            let ctx = ffmpeg_next::format::open_with(
                &url,
                &ffmpeg_next::format::Format::Input(format),
                ffmpeg_next::Dictionary::new(),
            )?;
            Ok(ctx.input())
        }
    }
}

/// Capture demuxer name and device URL for a device index on this platform.
#[cfg(target_os = "linux")]
fn capture_device(index: u32) -> Result<(&'static str, String), ffmpeg_next::Error> {
    Ok(("video4linux2", format!("/dev/video{index}")))
}

#[cfg(target_os = "macos")]
fn capture_device(index: u32) -> Result<(&'static str, String), ffmpeg_next::Error> {
    Ok(("avfoundation", index.to_string()))
}

/// DirectShow addresses cameras by name, so the index selects among the
/// video devices it enumerates.
#[cfg(target_os = "windows")]
fn capture_device(index: u32) -> Result<(&'static str, String), ffmpeg_next::Error> {
    let names = dshow_video_devices()?;
    let name = names
        .get(index as usize)
        .ok_or(ffmpeg_next::Error::StreamNotFound)?;
    Ok(("dshow", format!("video={name}")))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn capture_device(_index: u32) -> Result<(&'static str, String), ffmpeg_next::Error> {
    Err(ffmpeg_next::Error::DemuxerNotFound)
}

#[cfg(target_os = "windows")]
fn dshow_video_devices() -> Result<Vec<String>, ffmpeg_next::Error> {
    use ffmpeg_next::ffi;
    use std::ffi::CStr;

    let mut names = Vec::new();
    unsafe {
        let format = ffi::av_find_input_format(b"dshow\0".as_ptr() as *const std::os::raw::c_char);
        if format.is_null() {
            return Err(ffmpeg_next::Error::DemuxerNotFound);
        }
        let mut list: *mut ffi::AVDeviceInfoList = std::ptr::null_mut();
        let ret = ffi::avdevice_list_input_sources(
            format,
            std::ptr::null(),
            std::ptr::null_mut(),
            &mut list,
        );
        if ret < 0 {
            ffi::avdevice_free_list_devices(&mut list);
            return Err(ffmpeg_next::Error::from(ret));
        }

        for i in 0..(*list).nb_devices.max(0) as usize {
            let device = *(*list).devices.add(i);
            if device.is_null() || (*device).device_name.is_null() {
                continue;
            }
            let media_types = (*device).media_types;
            let is_video = (0..(*device).nb_media_types.max(0) as usize).any(|m| {
                !media_types.is_null()
                    && *media_types.add(m) == ffi::AVMediaType::AVMEDIA_TYPE_VIDEO
            });
            if is_video {
                let name = CStr::from_ptr((*device).device_name);
                names.push(name.to_string_lossy().into_owned());
            }
        }
        ffi::avdevice_free_list_devices(&mut list);
    }
    Ok(names)
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}
