use std::sync::Arc;
use std::time::Duration;

use iced::keyboard::{self, Key};
use iced::widget::{container, image, text};
use iced::{event, Element, Event, Length, Subscription, Task};

use facemesh_stream_core::shared::cancellation::CancellationToken;
use facemesh_stream_core::shared::frame::Frame;
use facemesh_stream_core::shared::frame_buffer::FrameBuffer;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub enum Message {
    Poll,
    Quit,
}

/// Live preview of the annotated frames produced for streaming.
pub struct Viewer {
    buffer: Arc<FrameBuffer>,
    cancel: CancellationToken,
    current: Option<image::Handle>,
    shown: usize,
}

impl Viewer {
    pub fn new(buffer: Arc<FrameBuffer>, cancel: CancellationToken) -> Self {
        Self {
            buffer,
            cancel,
            current: None,
            shown: 0,
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Poll => {
                if self.cancel.is_cancelled() {
                    return iced::exit();
                }
                if let Some(frame) = self.buffer.pop() {
                    self.current = Some(to_handle(&frame));
                    self.shown += 1;
                }
            }
            Message::Quit => {
                log::info!("Quit requested after {} frames", self.shown);
                self.cancel.cancel();
                return iced::exit();
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let content: Element<'_, Message> = match &self.current {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("Waiting for a client to connect...").into(),
        };
        container(content).center(Length::Fill).into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(POLL_INTERVAL).map(|_| Message::Poll),
            event::listen_with(quit_key),
        ])
    }
}

fn quit_key(event: Event, _status: event::Status, _window: iced::window::Id) -> Option<Message> {
    match event {
        Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) if is_quit_key(&key) => {
            Some(Message::Quit)
        }
        _ => None,
    }
}

fn is_quit_key(key: &Key) -> bool {
    matches!(key, Key::Character(c) if c.as_str().eq_ignore_ascii_case("q"))
}

fn to_handle(frame: &Frame) -> image::Handle {
    image::Handle::from_rgba(frame.width(), frame.height(), frame.to_rgba())
}
