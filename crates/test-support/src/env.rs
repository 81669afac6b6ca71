use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes every test that mutates process environment variables.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Sets (or unsets) environment variables for the duration of a test and
/// restores the previous values on drop. Holds [`env_lock`] the whole time.
pub struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, Option<&str>)]) -> Self {
        let lock = env_lock().lock().unwrap_or_else(|err| err.into_inner());
        let mut saved = Vec::with_capacity(vars.len());

        for (key, value) in vars {
            saved.push(((*key).to_string(), std::env::var(key).ok()));
            // SAFETY: tests using EnvGuard are serialized by env_lock.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }

        Self { _lock: lock, saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using EnvGuard are serialized by env_lock.
        unsafe {
            for (key, value) in self.saved.iter().rev() {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
