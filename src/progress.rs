//! 进度回调

/// 进度汇报接口，三个回调都可以不实现
pub trait Progress {
    /// 开始新的进度阶段
    fn on_stage_start(&mut self, _max: usize) {}

    /// 阶段内推进
    fn on_progress(&mut self, _value: usize) {}

    /// 阶段描述
    fn on_status(&mut self, _text: &str) {}
}

/// 什么都不做
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// 由可选闭包组成的进度回调
#[derive(Default)]
pub struct ProgressHooks<'a> {
    stage_start: Option<Box<dyn FnMut(usize) + 'a>>,
    progress: Option<Box<dyn FnMut(usize) + 'a>>,
    status: Option<Box<dyn FnMut(&str) + 'a>>,
}

impl<'a> ProgressHooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_start(mut self, f: impl FnMut(usize) + 'a) -> Self {
        self.stage_start = Some(Box::new(f));
        self
    }

    pub fn progress(mut self, f: impl FnMut(usize) + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn status(mut self, f: impl FnMut(&str) + 'a) -> Self {
        self.status = Some(Box::new(f));
        self
    }
}

impl Progress for ProgressHooks<'_> {
    fn on_stage_start(&mut self, max: usize) {
        if let Some(f) = self.stage_start.as_mut() {
            f(max);
        }
    }

    fn on_progress(&mut self, value: usize) {
        if let Some(f) = self.progress.as_mut() {
            f(value);
        }
    }

    fn on_status(&mut self, text: &str) {
        if let Some(f) = self.status.as_mut() {
            f(text);
        }
    }
}
