//! USB CDC-ACM link split across the two cores.
//!
//! Core 0 runs the USB device and two pump tasks moving packets between the
//! CDC endpoints and a pair of pipes. Core 1's capture engine sees the pipes
//! through [`PipeTransport`], whose every call is non-blocking.

use core::convert::Infallible;

use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::{Builder, UsbDevice};
use platform::config::DEVICE_ID;
use platform::SerialTransport;
use static_cell::StaticCell;

use crate::boot::{
    RX_PIPE_BYTES, TX_PIPE_BYTES, USB_MANUFACTURER, USB_PACKET_BYTES, USB_PID, USB_PRODUCT,
    USB_VID,
};

/// USB driver type on this board.
pub type UsbDriver = Driver<'static, USB>;

/// Host → device bytes.
pub type RxPipe = Pipe<CriticalSectionRawMutex, RX_PIPE_BYTES>;

/// Device → host bytes.
pub type TxPipe = Pipe<CriticalSectionRawMutex, TX_PIPE_BYTES>;

/// Commands and abort bytes from the host.
pub static RX_PIPE: RxPipe = Pipe::new();

/// Replies and capture data to the host.
pub static TX_PIPE: TxPipe = Pipe::new();

const PACKET: usize = USB_PACKET_BYTES as usize;

/// The built USB stack, ready to be handed to the pump tasks.
pub struct UsbLink {
    /// Device state machine.
    pub device: UsbDevice<'static, UsbDriver>,
    /// CDC IN endpoint.
    pub sender: Sender<'static, UsbDriver>,
    /// CDC OUT endpoint.
    pub receiver: Receiver<'static, UsbDriver>,
}

/// Build the CDC-ACM device. Call once.
pub fn build(driver: UsbDriver) -> UsbLink {
    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static CDC_STATE: StaticCell<State> = StaticCell::new();

    let mut config = embassy_usb::Config::new(USB_VID, USB_PID);
    config.manufacturer = Some(USB_MANUFACTURER);
    config.product = Some(USB_PRODUCT);
    config.serial_number = Some(DEVICE_ID);
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );
    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), USB_PACKET_BYTES);
    let device = builder.build();
    let (sender, receiver) = class.split();
    UsbLink {
        device,
        sender,
        receiver,
    }
}

/// Runs the USB device state machine.
#[embassy_executor::task]
pub async fn device_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// OUT endpoint → [`RX_PIPE`].
#[embassy_executor::task]
pub async fn rx_task(mut receiver: Receiver<'static, UsbDriver>) -> ! {
    let mut packet = [0u8; PACKET];
    loop {
        receiver.wait_connection().await;
        defmt::info!("usb: host connected");
        while let Ok(n) = receiver.read_packet(&mut packet).await {
            RX_PIPE.write_all(packet.get(..n).unwrap_or_default()).await;
        }
        defmt::info!("usb: host disconnected");
    }
}

/// [`TX_PIPE`] → IN endpoint.
#[embassy_executor::task]
pub async fn tx_task(mut sender: Sender<'static, UsbDriver>) -> ! {
    let mut packet = [0u8; PACKET];
    loop {
        sender.wait_connection().await;
        loop {
            let n = TX_PIPE.read(&mut packet).await;
            if sender.write_packet(packet.get(..n).unwrap_or_default()).await.is_err() {
                break;
            }
            // A full packet with nothing behind it needs a ZLP to end the transfer.
            if n == PACKET && TX_PIPE.is_empty() && sender.write_packet(&[]).await.is_err() {
                break;
            }
        }
    }
}

/// Non-blocking view of the pipes for the capture engine.
pub struct PipeTransport {
    rx: &'static RxPipe,
    tx: &'static TxPipe,
}

impl PipeTransport {
    /// Transport over [`RX_PIPE`] and [`TX_PIPE`].
    pub const fn new() -> Self {
        Self {
            rx: &RX_PIPE,
            tx: &TX_PIPE,
        }
    }
}

impl Default for PipeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport for PipeTransport {
    type Error = Infallible;

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.rx.try_read(buf).unwrap_or(0))
    }

    fn write_space(&self) -> usize {
        self.tx.free_capacity()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if data.is_empty() {
            return Ok(0);
        }
        Ok(self.tx.try_write(data).unwrap_or(0))
    }
}
