use std::sync::{Mutex, MutexGuard, PoisonError};

/// 获取 std 互斥锁；锁中毒时沿用内部数据
///
/// 只用于保护簿记状态（进行中标记、计数器），持锁期间不得 await。
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn recovers_from_poisoned_lock() {
        let shared = Arc::new(Mutex::new(1));
        let cloned = shared.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert!(shared.is_poisoned());
        *lock_or_recover(&shared) += 1;
        assert_eq!(*lock_or_recover(&shared), 2);
    }
}
