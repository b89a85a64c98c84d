//! # lumos demo
//!
//! ```text
//! lumos --image_server [options] <input>   publish frames on port 61616
//! lumos --image_client [options] <host:port>
//! lumos --event_logger [options]           collect events on port 62626
//! ```
//!
//! Ports and the event separator can be overridden in the configuration
//! file (`image_server.port`, `event_logger.port`, `event_logger.sep`).
//!
//! Every mode runs until its input ends or Ctrl+C is pressed.

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use log::{info, warn};
use std::thread;

use lumos::context::InputSource;
use lumos::device::{InputDevice, OutputDevice, StillImageInput};
use lumos::net::{
    event_logger, image_server, EventLogger, EventLoggerOptions, ImageClient, ImageServer,
};
use lumos::shutdown::Interrupt;
use lumos::{Context, Options};

#[derive(Parser, Debug)]
#[command(author, version, about = "lumos demo programs", long_about = None)]
struct Args {
    /// Publish frames from the input source through an image server
    #[arg(long = "image_server", conflicts_with_all = ["image_client", "event_logger"])]
    image_server: bool,

    /// Read frames from a remote image server
    #[arg(long = "image_client", conflicts_with = "event_logger")]
    image_client: bool,

    /// Collect remote events into a file
    #[arg(long = "event_logger")]
    event_logger: bool,

    #[command(flatten)]
    options: Options,
}

fn open_input(context: &Context) -> Result<Box<dyn InputDevice>> {
    let looping = context.options().loop_video;
    match context.input_source() {
        InputSource::Image(path) | InputSource::Directory(path) => {
            Ok(Box::new(StillImageInput::open(path, looping)?))
        }
        InputSource::Remote(endpoint) => Ok(Box::new(ImageClient::for_endpoint(endpoint)?)),
        other => bail!("unsupported input source for this demo: {:?}", other),
    }
}

fn run_image_server(context: &Context, interrupt: &Interrupt) -> Result<()> {
    let mut input = open_input(context)?;
    let port = context.config_port("image_server.port", image_server::DEFAULT_PORT);
    let mut server = ImageServer::new(port)?;
    info!("Publishing frames on port {}", port);

    let mut count = 0u64;
    while !interrupt.is_triggered() {
        let Some(frame) = input.read() else {
            info!("Input ended");
            break;
        };
        OutputDevice::write(&mut server, frame);
        count += 1;
        context.update();
        if let Some(delay) = context.delay() {
            thread::sleep(delay);
        }
    }

    info!("Published {} frames in {:.2?}", count, context.time_now());
    input.release();
    OutputDevice::stop(&mut server);
    Ok(())
}

fn run_image_client(context: &Context, interrupt: &Interrupt) -> Result<()> {
    let mut client = match context.remote_endpoint() {
        Some(endpoint) => ImageClient::for_endpoint(endpoint)?,
        None => ImageClient::new(
            lumos::net::image_client::DEFAULT_HOST,
            context.config_port("image_server.port", image_server::DEFAULT_PORT),
        )?,
    };

    while !interrupt.is_triggered() {
        let Some(frame) = client.read() else {
            info!("Image stream ended");
            break;
        };
        info!(
            "Received {}x{} image ({} channels)",
            frame.width, frame.height, frame.channels
        );
        if let Some(delay) = context.delay() {
            thread::sleep(delay);
        }
    }
    client.release();
    Ok(())
}

fn run_event_logger(context: &Context, interrupt: &Interrupt) -> Result<()> {
    let mut options = EventLoggerOptions {
        port: context.config_port("event_logger.port", event_logger::DEFAULT_PORT),
        ..Default::default()
    };
    if let Some(sep) = context.config_value("event_logger.sep").and_then(|v| v.as_str()) {
        options.sep = sep.to_string();
    }
    let mut logger = EventLogger::new(options);
    if !logger.server_started() {
        bail!("event logger could not start");
    }
    info!("Writing events to {}", logger.filename().display());

    while !interrupt.is_triggered() {
        thread::sleep(std::time::Duration::from_millis(100));
    }
    logger.stop();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !(args.image_server || args.image_client || args.event_logger) {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    let context = Context::create_instance(args.options)?;
    let interrupt = Interrupt::on_ctrl_c();

    let result = if args.image_server {
        run_image_server(context, &interrupt)
    } else if args.image_client {
        run_image_client(context, &interrupt)
    } else {
        run_event_logger(context, &interrupt)
    };

    if let Err(e) = &result {
        warn!("Stopped with error: {:#}", e);
    }
    result
}
