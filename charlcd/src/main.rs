mod config;
mod utils;

use crate::config::Config;
use crate::utils::{DisplayExt, parse_pins};
use charlcd_gpio::gpiod::GpiodDriver;
use charlcd_gpio::lcd::hd44780::LcdPins;
use charlcd_gpio::lcd::hd44780::driver::GpioHD44780Driver;
use dotenv::dotenv;
use log::{debug, info};
use std::env::{args, var};
use std::thread;
use std::time::Duration;
use sysinfo::System;
use time::OffsetDateTime;
use time::macros::format_description;

const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "charlcd v{} on {} ({})",
        env!("CARGO_PKG_VERSION"),
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    debug!(
        "Kernel ver {}, architecture {}",
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    // Get pin numbers from env
    let chip_path = var("CHARLCD_GPIO_CHIP").unwrap_or_else(|_| DEFAULT_GPIO_CHIP.to_string());
    let pins = LcdPins {
        enable: var("CHARLCD_PIN_E")?.parse()?,
        register_select: var("CHARLCD_PIN_RS")?.parse()?,
        data: parse_pins(&var("CHARLCD_PINS_DATA")?)?,
    };

    info!(
        "LCD @ {}, E: {}, RS: {}, Data: {:?}",
        chip_path, pins.enable, pins.register_select, pins.data
    );

    let config_path = Config::path();
    debug!("Trying to load config from {}...", config_path.display());
    let config = match Config::load(&config_path)? {
        Some(config) => {
            info!("Config loaded.");
            config
        }
        None => {
            info!("Config not found. Using default");
            let config = Config::default();
            config.save_new(&config_path)?;
            info!("Default config saved to {}.", config_path.display());
            config
        }
    };
    let timing = config.timing()?;
    debug!("Timing: {:?}", timing);

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing LCD driver...");
    let mut lcd = GpioHD44780Driver::open(&gpio, pins, timing)?;
    debug!("{:?} initialized.", lcd);

    let message = args().skip(1).collect::<Vec<_>>().join(" ");
    if !message.is_empty() {
        info!("Printing {:?}", message);
        lcd.print(&message)?;
        return Ok(());
    }

    info!("No message given, showing the clock...");
    let format = format_description!("[hour]:[minute]:[second]");
    loop {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        lcd.print(&now.format(&format)?)?;

        thread::sleep(Duration::from_secs(1));
    }
}
