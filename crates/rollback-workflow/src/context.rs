/// Data threaded through every activity of one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessContext<S> {
    seed: S,
    stopped: bool,
}

impl<S> ProcessContext<S> {
    #[must_use]
    pub fn new(seed: S) -> Self {
        Self {
            seed,
            stopped: false,
        }
    }

    #[must_use]
    pub fn seed(&self) -> &S {
        &self.seed
    }

    pub fn seed_mut(&mut self) -> &mut S {
        &mut self.seed
    }

    #[must_use]
    pub fn into_seed(self) -> S {
        self.seed
    }

    /// Skip every remaining activity; the execution still completes successfully.
    pub fn stop_process(&mut self) {
        self.stopped = true;
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_running() {
        let ctx = ProcessContext::new(5);
        assert!(!ctx.is_stopped());
        assert_eq!(*ctx.seed(), 5);
    }

    #[test]
    fn stop_process_marks_context_stopped() {
        let mut ctx = ProcessContext::new(Vec::<u8>::new());
        ctx.seed_mut().push(1);
        ctx.stop_process();

        assert!(ctx.is_stopped());
        assert_eq!(ctx.into_seed(), vec![1]);
    }
}
