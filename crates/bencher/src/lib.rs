use micro_htp::personality::ServerPersonality;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    personality: ServerPersonality,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, personality: ServerPersonality, file: TestFile) -> Self {
        Self { name, personality, file }
    }

    pub fn generic(name: &'static str, file: TestFile) -> Self {
        Self::new(name, ServerPersonality::Generic, file)
    }

    pub fn apache(name: &'static str, file: TestFile) -> Self {
        Self::new(name, ServerPersonality::Apache2, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn personality(&self) -> ServerPersonality {
        self.personality
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }

    /// Benchmark id, `<name>/<personality>`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.name, self.personality)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}
