//! Robot command interface.
//!
//! The kernel speaks to the robot controller through four discrete,
//! parameterless commands; each maps to a fixed speed preset or stop flag on
//! the controller side. Transport concerns, including the single
//! reconnect-and-resend retry, live entirely on this side of the seam; the
//! state machine above only sees success or failure.
//!
//! The default build ships a simulated robot. The real field-bus transport
//! (Modbus TCP, matching the cell's PLC register map) is behind the
//! `robot-modbus` feature.

use anyhow::Result;

/// Discrete command contract to the physical robot controller.
pub trait RobotInterface: Send {
    /// Transport identifier for logs.
    fn name(&self) -> &'static str;

    /// Run at the normal speed preset.
    fn start(&mut self) -> Result<()>;

    /// Run at the slow speed preset.
    fn slow(&mut self) -> Result<()>;

    /// Halt motion.
    fn stop(&mut self) -> Result<()>;

    /// Run at the fast speed preset. Bench/commissioning use only; the
    /// safety state machine never commands it.
    fn fast(&mut self) -> Result<()>;

    /// Drop servo power entirely.
    fn servo_off(&mut self) -> Result<()>;

    /// Re-establish the transport after a failure. Transports without a
    /// connection concept can leave the default no-op.
    fn reconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

// -------------------- Simulated Robot --------------------

/// In-process robot for tests, demos and builds without field-bus hardware.
/// Records the last command and always succeeds.
#[derive(Debug, Default)]
pub struct SimulatedRobot {
    last_command: Option<&'static str>,
}

impl SimulatedRobot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_command(&self) -> Option<&'static str> {
        self.last_command
    }

    fn record(&mut self, command: &'static str) -> Result<()> {
        self.last_command = Some(command);
        log::info!("simulated robot: {}", command);
        Ok(())
    }
}

impl RobotInterface for SimulatedRobot {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn start(&mut self) -> Result<()> {
        self.record("start")
    }

    fn slow(&mut self) -> Result<()> {
        self.record("slow")
    }

    fn stop(&mut self) -> Result<()> {
        self.record("stop")
    }

    fn fast(&mut self) -> Result<()> {
        self.record("fast")
    }

    fn servo_off(&mut self) -> Result<()> {
        self.record("servo_off")
    }
}

// -------------------- Retry Wrapper --------------------

/// Wraps a transport with the one-shot reconnect-and-resend policy: a failed
/// command triggers a reconnect and a single resend before the failure is
/// reported upward.
pub struct RetryingRobot<R: RobotInterface> {
    inner: R,
}

impl<R: RobotInterface> RetryingRobot<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn with_retry(
        &mut self,
        command: &'static str,
        call: impl Fn(&mut R) -> Result<()>,
    ) -> Result<()> {
        match call(&mut self.inner) {
            Ok(()) => Ok(()),
            Err(first) => {
                log::warn!(
                    "robot command {} failed ({}), reconnecting for one resend",
                    command,
                    first
                );
                self.inner.reconnect()?;
                call(&mut self.inner)
            }
        }
    }
}

impl<R: RobotInterface> RobotInterface for RetryingRobot<R> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn start(&mut self) -> Result<()> {
        self.with_retry("start", |r| r.start())
    }

    fn slow(&mut self) -> Result<()> {
        self.with_retry("slow", |r| r.slow())
    }

    fn stop(&mut self) -> Result<()> {
        self.with_retry("stop", |r| r.stop())
    }

    fn fast(&mut self) -> Result<()> {
        self.with_retry("fast", |r| r.fast())
    }

    fn servo_off(&mut self) -> Result<()> {
        self.with_retry("servo_off", |r| r.servo_off())
    }

    fn reconnect(&mut self) -> Result<()> {
        self.inner.reconnect()
    }
}

// -------------------- Modbus TCP Robot --------------------

#[cfg(feature = "robot-modbus")]
pub use modbus::ModbusRobot;

#[cfg(feature = "robot-modbus")]
mod modbus {
    use super::RobotInterface;
    use anyhow::{anyhow, Context as _, Result};
    use std::net::SocketAddr;
    use tokio::runtime::Runtime;
    use tokio_modbus::prelude::*;

    // Controller register map. The PLC mirrors coils onto holding
    // registers, odd-addressed with a doubling stride, hence the
    // `reg * 2 + 1` encoding below.
    //
    // 65/66: operation + servo enable pair, both held at 1 while running.
    // 67: cycle stop flag.
    // 15213: feed-rate override percentage.
    const REG_OPERATION_ENABLE: u16 = 65;
    const REG_SERVO_ENABLE: u16 = 66;
    const REG_CYCLE_STOP: u16 = 67;
    const REG_SPEED_OVERRIDE: u16 = 15213;

    const SPEED_NORMAL: u16 = 30;
    const SPEED_SLOW: u16 = 10;
    const SPEED_FAST: u16 = 70;

    /// Modbus TCP transport to the robot controller PLC.
    pub struct ModbusRobot {
        addr: SocketAddr,
        slave_id: u8,
        runtime: Runtime,
        ctx: Option<tokio_modbus::client::Context>,
    }

    impl ModbusRobot {
        pub fn connect(address: &str, port: u16, slave_id: u8) -> Result<Self> {
            let addr: SocketAddr = format!("{}:{}", address, port)
                .parse()
                .with_context(|| format!("invalid robot controller address {}", address))?;
            let runtime = Runtime::new().context("modbus runtime")?;
            let mut robot = Self {
                addr,
                slave_id,
                runtime,
                ctx: None,
            };
            robot.open()?;
            Ok(robot)
        }

        fn open(&mut self) -> Result<()> {
            let addr = self.addr;
            let slave = Slave(self.slave_id);
            let ctx = self
                .runtime
                .block_on(async { tcp::connect_slave(addr, slave).await })
                .with_context(|| format!("connect to robot controller at {}", addr))?;
            self.ctx = Some(ctx);
            Ok(())
        }

        fn write(&mut self, register: u16, value: u16) -> Result<()> {
            let ctx = self
                .ctx
                .as_mut()
                .ok_or_else(|| anyhow!("robot controller not connected"))?;
            let addr = register * 2 + 1;
            let response = self
                .runtime
                .block_on(ctx.write_single_register(addr, value));
            match response {
                Ok(Ok(())) => Ok(()),
                Ok(Err(exception)) => Err(anyhow!(
                    "controller rejected write to register {}: {}",
                    register,
                    exception
                )),
                Err(err) => {
                    // Connection is suspect after a transport error.
                    self.ctx = None;
                    Err(anyhow!("write to register {} failed: {}", register, err))
                }
            }
        }

        fn enable_pair(&mut self) -> Result<()> {
            self.write(REG_OPERATION_ENABLE, 1)?;
            self.write(REG_SERVO_ENABLE, 1)
        }
    }

    impl RobotInterface for ModbusRobot {
        fn name(&self) -> &'static str {
            "modbus-tcp"
        }

        fn start(&mut self) -> Result<()> {
            self.enable_pair()?;
            self.write(REG_CYCLE_STOP, 0)?;
            self.write(REG_SPEED_OVERRIDE, SPEED_NORMAL)
        }

        fn slow(&mut self) -> Result<()> {
            self.enable_pair()?;
            self.write(REG_SPEED_OVERRIDE, SPEED_SLOW)
        }

        fn stop(&mut self) -> Result<()> {
            self.enable_pair()?;
            self.write(REG_CYCLE_STOP, 1)
        }

        fn fast(&mut self) -> Result<()> {
            self.enable_pair()?;
            self.write(REG_SPEED_OVERRIDE, SPEED_FAST)
        }

        fn servo_off(&mut self) -> Result<()> {
            self.write(REG_OPERATION_ENABLE, 0)?;
            self.write(REG_SERVO_ENABLE, 0)?;
            self.write(REG_CYCLE_STOP, 0)
        }

        fn reconnect(&mut self) -> Result<()> {
            self.ctx = None;
            self.open()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Fails a configurable number of leading calls, then succeeds.
    struct FlakyRobot {
        failures_left: u32,
        calls: u32,
        reconnects: u32,
    }

    impl RobotInterface for FlakyRobot {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn start(&mut self) -> Result<()> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(anyhow!("transport down"));
            }
            Ok(())
        }

        fn slow(&mut self) -> Result<()> {
            self.start()
        }

        fn stop(&mut self) -> Result<()> {
            self.start()
        }

        fn fast(&mut self) -> Result<()> {
            self.start()
        }

        fn servo_off(&mut self) -> Result<()> {
            self.start()
        }

        fn reconnect(&mut self) -> Result<()> {
            self.reconnects += 1;
            Ok(())
        }
    }

    #[test]
    fn retry_resends_once_after_reconnect() {
        let mut robot = RetryingRobot::new(FlakyRobot {
            failures_left: 1,
            calls: 0,
            reconnects: 0,
        });
        assert!(robot.stop().is_ok());
        let inner = robot.into_inner();
        assert_eq!(inner.calls, 2);
        assert_eq!(inner.reconnects, 1);
    }

    #[test]
    fn retry_gives_up_after_the_single_resend() {
        let mut robot = RetryingRobot::new(FlakyRobot {
            failures_left: 2,
            calls: 0,
            reconnects: 0,
        });
        assert!(robot.stop().is_err());
        let inner = robot.into_inner();
        assert_eq!(inner.calls, 2);
        assert_eq!(inner.reconnects, 1);
    }

    #[test]
    fn simulated_robot_records_last_command() {
        let mut robot = SimulatedRobot::new();
        assert!(robot.last_command().is_none());
        robot.slow().unwrap();
        assert_eq!(robot.last_command(), Some("slow"));
        robot.servo_off().unwrap();
        assert_eq!(robot.last_command(), Some("servo_off"));
    }
}
