use std::time::{Duration, SystemTime};

/// Short, mostly-unique id used to name one-shot containers so they can be stopped on timeout.
pub fn create_run_id() -> String {
    // Compose from time and pid without extra deps
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    let pid = std::process::id() as u128;
    let mix = now.as_nanos() ^ pid;
    // base36 encode last 40 bits for brevity
    let mut v = (mix & 0xff_ffff_ffff) as u64;
    let alphabet = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut s = String::new();
    if v == 0 {
        s.push('0');
    }
    while v > 0 {
        s.push(alphabet[(v % 36) as usize] as char);
        v /= 36;
    }
    s.chars().rev().collect()
}
