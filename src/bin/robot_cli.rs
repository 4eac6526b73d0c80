//! robot_cli - interactive field-bus bench tool
//!
//! Drives the robot command contract by hand for commissioning and cabling
//! checks, outside any safety evaluation. Build with `--features
//! robot-modbus` to reach real hardware; the default build talks to the
//! simulated transport.

use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};

use perimeter_kernel::{RetryingRobot, RobotInterface};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Robot controller address.
    #[arg(long, env = "PERIMETER_ROBOT_ADDR", default_value = "192.168.0.2")]
    address: String,
    /// Modbus TCP port.
    #[arg(long, default_value_t = 502)]
    port: u16,
    /// Modbus slave id of the robot controller.
    #[arg(long, default_value_t = 2)]
    slave_id: u8,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut robot = build_robot(&args)?;
    println!("connected to {} transport", robot.name());
    println!(
        "commands: s=start  p=stop  f=fast  l=slow  o=servo off  q=quit"
    );

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let outcome = match line.trim().to_lowercase().as_str() {
            "s" => robot.start(),
            "p" => robot.stop(),
            "f" => robot.fast(),
            "l" => robot.slow(),
            "o" => robot.servo_off(),
            "q" => break,
            "" => continue,
            other => {
                println!("unknown command '{}'; use s, p, f, l, o or q", other);
                continue;
            }
        };
        match outcome {
            Ok(()) => println!("ok"),
            Err(err) => println!("command failed: {}", err),
        }
    }
    Ok(())
}

#[cfg(feature = "robot-modbus")]
fn build_robot(args: &Args) -> Result<Box<dyn RobotInterface>> {
    let robot =
        perimeter_kernel::robot::ModbusRobot::connect(&args.address, args.port, args.slave_id)?;
    Ok(Box::new(RetryingRobot::new(robot)))
}

#[cfg(not(feature = "robot-modbus"))]
fn build_robot(_args: &Args) -> Result<Box<dyn RobotInterface>> {
    Ok(Box::new(RetryingRobot::new(
        perimeter_kernel::SimulatedRobot::new(),
    )))
}
