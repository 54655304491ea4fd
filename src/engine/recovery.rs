/// Clean passes through the window required to clear a recovery.
pub const RECOVERY_PASSES: u32 = 3;

/// Maximum number of sections in a recovery window.
pub const WINDOW_SPAN: usize = 3;

/// The run of up to [`WINDOW_SPAN`] consecutive sections ending at a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    start: usize,
    target: usize,
}

impl Window {
    pub fn ending_at(target: usize) -> Self {
        Self {
            start: target.saturating_sub(WINDOW_SPAN - 1),
            target,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.target - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Section at position `i` of the window.
    pub fn get(&self, i: usize) -> Option<usize> {
        (i < self.len()).then(|| self.start + i)
    }

    pub fn is_last(&self, i: usize) -> bool {
        i + 1 == self.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.start..=self.target
    }
}

/// A remedial loop over the window ending at `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recovery {
    pub target: usize,
    pub passes_left: u32,
    pub passes_total: u32,
}

impl Recovery {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            passes_left: RECOVERY_PASSES,
            passes_total: RECOVERY_PASSES,
        }
    }

    pub fn window(&self) -> Window {
        Window::ending_at(self.target)
    }

    pub fn passes_done(&self) -> u32 {
        self.passes_total - self.passes_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        for target in 0..20 {
            let w = Window::ending_at(target);
            assert_eq!(w.len(), (target + 1).min(WINDOW_SPAN));
            assert_eq!(w.iter().last(), Some(target));
            assert_eq!(w.get(w.len() - 1), Some(target));
            assert!(w.is_last(w.len() - 1));
            assert_eq!(w.get(w.len()), None);
        }
    }

    #[test]
    fn test_window_near_start() {
        assert_eq!(Window::ending_at(0).iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(Window::ending_at(1).iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(
            Window::ending_at(5).iter().collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
    }

    #[test]
    fn test_new_recovery_has_full_passes() {
        let r = Recovery::new(4);
        assert_eq!(r.passes_left, RECOVERY_PASSES);
        assert_eq!(r.passes_total, RECOVERY_PASSES);
        assert_eq!(r.passes_done(), 0);
        assert_eq!(r.window().start(), 2);
    }
}
