use log::info;

use crate::manager::supervisor::InterruptHandle;

/// Routes Ctrl+C to the supervisor. The handler thread only forwards an
/// event; the supervisor's own loop runs the shutdown.
pub fn install_interrupt_handler(handle: InterruptHandle) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("Interrupt signal received.");
        handle.interrupt();
    })
}
