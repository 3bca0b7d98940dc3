// FallWatch — Platform shims
//
// The few system services the pipeline needs: a monotonic microsecond clock,
// heap statistics and a full restart.  On target these map to ESP-IDF; on a
// desktop build they fall back to std.

/// Microseconds since boot (since first call on host).
#[cfg(target_os = "espidf")]
pub fn now_us() -> u64 {
    // SAFETY: esp_timer is started by the IDF before app_main.
    unsafe { esp_idf_sys::esp_timer_get_time() as u64 }
}

#[cfg(not(target_os = "espidf"))]
pub fn now_us() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static BOOT: OnceLock<Instant> = OnceLock::new();
    BOOT.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// `(free, minimum-ever free)` heap bytes.
#[cfg(target_os = "espidf")]
pub fn heap_stats() -> Option<(u32, u32)> {
    // SAFETY: plain reads of allocator counters.
    unsafe {
        Some((
            esp_idf_sys::esp_get_free_heap_size(),
            esp_idf_sys::esp_get_minimum_free_heap_size(),
        ))
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn heap_stats() -> Option<(u32, u32)> {
    None
}

/// Restart the whole system. Does not return.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    log::error!("Restarting system");
    unsafe {
        esp_idf_sys::esp_restart();
    }
}

/// On a desktop the supervisor (systemd, a shell loop) restarts us.
#[cfg(not(target_os = "espidf"))]
pub fn restart() -> ! {
    log::error!("Restarting system (process exit)");
    std::process::exit(1)
}
