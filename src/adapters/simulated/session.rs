use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};
use tracing::{debug, info};

use crate::application::ports::SessionHandle;
use crate::domain::{
    errors::{DomainError, DomainResult},
    frame::{Frame, PhotoData},
    settings::StreamQuality,
    stream::SessionSignal,
};

/// Los frames que no caben se descartan: solo importa el último.
const FRAME_BUFFER: usize = 4;

/// Contabilidad compartida de sesiones abiertas/cerradas.
#[derive(Debug, Default)]
pub struct SessionLedger {
    opened: AtomicUsize,
    closed: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl SessionLedger {
    fn on_open(&self) {
        let opened = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = opened.saturating_sub(self.closed.load(Ordering::SeqCst));
        self.max_concurrent.fetch_max(live, Ordering::SeqCst);
    }

    fn on_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn open_now(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

/// Sesión simulada. En modo automático emite Starting -> Streaming y un patrón
/// de prueba al ritmo pedido; en modo manual los tests empujan frames y señales.
pub struct SimulatedSession {
    id: usize,
    quality: StreamQuality,
    target_fps: u32,
    width: u32,
    height: u32,
    closed: AtomicBool,
    ledger: Arc<SessionLedger>,
    frame_tx: Mutex<Option<mpsc::Sender<DomainResult<Frame>>>>,
    frame_rx: Mutex<Option<mpsc::Receiver<DomainResult<Frame>>>>,
    signal_tx: Mutex<Option<mpsc::UnboundedSender<SessionSignal>>>,
    signal_rx: Mutex<Option<mpsc::UnboundedReceiver<SessionSignal>>>,
    photo_failure: Mutex<Option<String>>,
    photo_delay: Mutex<Duration>,
    generator: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedSession {
    pub(crate) fn open(
        id: usize,
        quality: StreamQuality,
        target_fps: u32,
        (width, height): (u32, u32),
        ledger: Arc<SessionLedger>,
    ) -> Arc<Self> {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        ledger.on_open();
        info!("Sesión simulada #{} abierta ({:?}, {} fps)", id, quality, target_fps);

        Arc::new(Self {
            id,
            quality,
            target_fps,
            width,
            height,
            closed: AtomicBool::new(false),
            ledger,
            frame_tx: Mutex::new(Some(frame_tx)),
            frame_rx: Mutex::new(Some(frame_rx)),
            signal_tx: Mutex::new(Some(signal_tx)),
            signal_rx: Mutex::new(Some(signal_rx)),
            photo_failure: Mutex::new(None),
            photo_delay: Mutex::new(Duration::ZERO),
            generator: Mutex::new(None),
        })
    }

    /// Arranca el generador de señales y frames sintéticos.
    pub(crate) fn start_generator(self: &Arc<Self>) {
        let (Some(frames), Some(signals)) = (self.frame_sender(), self.signal_sender()) else {
            return;
        };
        let (width, height) = (self.width, self.height);
        let period = Duration::from_millis(1000 / u64::from(self.target_fps.max(1)));

        let task = tokio::spawn(async move {
            let _ = signals.send(SessionSignal::Stopped);
            let _ = signals.send(SessionSignal::Starting);
            tokio::time::sleep(Duration::from_millis(150)).await;
            let _ = signals.send(SessionSignal::Streaming);

            let mut ticker = tokio::time::interval(period);
            let mut tick = 0u32;
            loop {
                ticker.tick().await;
                // try_send: si el consumidor va lento, el frame se pierde.
                if let Err(mpsc::error::TrySendError::Closed(_)) =
                    frames.try_send(Ok(test_pattern(width, height, tick)))
                {
                    break;
                }
                tick = tick.wrapping_add(1);
            }
        });

        if let Ok(mut generator) = self.generator.lock() {
            *generator = Some(task);
        }
    }

    fn frame_sender(&self) -> Option<mpsc::Sender<DomainResult<Frame>>> {
        self.frame_tx.lock().ok().and_then(|tx| tx.clone())
    }

    fn signal_sender(&self) -> Option<mpsc::UnboundedSender<SessionSignal>> {
        self.signal_tx.lock().ok().and_then(|tx| tx.clone())
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn quality(&self) -> StreamQuality {
        self.quality
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Entrega un frame. `false` si la sesión está cerrada o el buffer lleno.
    pub fn push_frame(&self, frame: Frame) -> bool {
        self.frame_sender().is_some_and(|tx| tx.try_send(Ok(frame)).is_ok())
    }

    /// Simula un fallo del propio flujo de vídeo.
    pub fn fail_frames(&self, message: &str) -> bool {
        self.frame_sender()
            .is_some_and(|tx| tx.try_send(Err(DomainError::Session(message.to_string()))).is_ok())
    }

    pub fn push_signal(&self, signal: SessionSignal) -> bool {
        self.signal_sender().is_some_and(|tx| tx.send(signal).is_ok())
    }

    /// Cada captura tarda `delay` antes de responder.
    pub fn set_photo_delay(&self, delay: Duration) {
        if let Ok(mut current) = self.photo_delay.lock() {
            *current = delay;
        }
    }

    /// Las próximas capturas de foto fallarán con `message`.
    pub fn fail_photos(&self, message: Option<&str>) {
        if let Ok(mut failure) = self.photo_failure.lock() {
            *failure = message.map(str::to_string);
        }
    }
}

#[async_trait]
impl SessionHandle for SimulatedSession {
    fn frames(&self) -> BoxStream<'static, DomainResult<Frame>> {
        match self.frame_rx.lock().ok().and_then(|mut rx| rx.take()) {
            Some(rx) => ReceiverStream::new(rx).boxed(),
            None => stream::empty().boxed(),
        }
    }

    fn signals(&self) -> BoxStream<'static, SessionSignal> {
        match self.signal_rx.lock().ok().and_then(|mut rx| rx.take()) {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => stream::empty().boxed(),
        }
    }

    async fn capture_photo(&self) -> DomainResult<PhotoData> {
        let delay = self.photo_delay.lock().map(|d| *d).unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        // Se comprueba al final: cerrar a mitad de captura también falla.
        if self.is_closed() {
            return Err(DomainError::Capture("sesión cerrada".into()));
        }
        if let Some(message) = self.photo_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(DomainError::Capture(message));
        }

        let (w, h) = (self.width, self.height);
        let pixels = (0..w * h)
            .flat_map(|i| {
                let (x, y) = (i % w, i / w);
                [(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 96]
            })
            .collect();
        Ok(PhotoData::Rgb { width: w, height: h, pixels })
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.generator.lock().ok().and_then(|mut g| g.take()) {
            task.abort();
        }
        // Soltar los emisores termina ambos flujos.
        if let Ok(mut tx) = self.frame_tx.lock() {
            tx.take();
        }
        if let Ok(mut tx) = self.signal_tx.lock() {
            tx.take();
        }
        self.ledger.on_close();
        debug!("Sesión simulada #{} cerrada", self.id);
    }
}

/// Frame I420 con un degradado que se desplaza con `tick`.
pub fn test_pattern(width: u32, height: u32, tick: u32) -> Frame {
    let (w, h) = (width as usize, height as usize);
    let mut data = Vec::with_capacity(Frame::expected_len(width, height));
    for y in 0..h {
        for x in 0..w {
            data.push(((x + y + tick as usize) % 256) as u8);
        }
    }
    let quarter = w * h / 4;
    data.extend((0..quarter).map(|n| ((n + tick as usize) % 64 + 96) as u8));
    data.extend((0..quarter).map(|n| (160 - (n % 64)) as u8));
    Frame::new(width, height, data)
}
