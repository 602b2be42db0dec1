#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::Config;
use embassy_time::{Delay, Timer};
use {defmt_rtt as _, panic_probe as _};

use pcabot_core::board::EchoPin;
use pcabot_core::config::UltrasonicConfig;
use pcabot_core::sensors::{DistanceUnit, InfraredSensor, Ultrasonic};

defmt::timestamp!("{=u64}", { embassy_time::Instant::now().as_millis() });

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_stm32::init(Config::default());

    info!("=== Sensor Debug Mode ===");

    // LED mirrors the center IR sensor
    let mut led = Output::new(p.PA5, Level::Low, Speed::Low);

    // same wiring as the main firmware
    let trig = Output::new(p.PA10, Level::Low, Speed::Low);
    let echo = EchoPin::new(Input::new(p.PB3, Pull::None));
    let mut sonar = Ultrasonic::new(trig, echo, Delay, UltrasonicConfig::default());

    let left = InfraredSensor::new(Input::new(p.PB5, Pull::Up));
    let center = InfraredSensor::new(Input::new(p.PB4, Pull::Up));
    let right = InfraredSensor::new(Input::new(p.PB10, Pull::Up));

    info!("Format: echo_us cm in | L C R (1 = line seen)");

    loop {
        let us = sonar.measure(DistanceUnit::Microseconds).await;
        let cm = sonar.measure(DistanceUnit::Centimeters).await;
        let inch = sonar.measure(DistanceUnit::Inches).await;
        match (us, cm, inch) {
            (Ok(us), Ok(cm), Ok(inch)) => info!("US: {} {} {}", us, cm, inch),
            _ => warn!("ultrasonic read failed"),
        }

        match (left.detects(), center.detects(), right.detects()) {
            (Ok(l), Ok(c), Ok(r)) => info!("IR: {} {} {}", l as u8, c as u8, r as u8),
            _ => warn!("IR read failed"),
        }

        if center.mirror_to(&mut led).is_err() {
            warn!("LED update failed");
        }

        Timer::after_millis(500).await;
    }
}
