//! The five-action pipeline driver.
//!
//! A unit owns one environment and a root spec. Each action drives its
//! stage to a fixed point, records failures in the environment
//! diagnostics, fires the surrounding events, and reports success as a
//! boolean; it never panics.

use crate::compilation::{Compilation, Environment};
use crate::compile::{Compiled, Compiler};
use crate::diagnostic::Severity;
use crate::document::Document;
use crate::memory::Memory;
use crate::spec::{Action, Event, Spec};
use crate::tree::TreeId;

/// Upper bound on fixed-point rounds; reaching it indicates a
/// non-converging spec and stops the action.
const MAX_ROUNDS: usize = 10_000;

#[derive(Debug)]
pub struct Unit {
    spec: Spec,
    environment: Environment,
}

impl Unit {
    pub fn new(spec: Spec) -> Self {
        Self {
            spec,
            environment: Environment::new(),
        }
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    fn fire(&self, action: Action, document: &str, memory: Option<&Memory>) {
        for listener in self.spec.listeners() {
            listener(&Event {
                action,
                document,
                memory,
            });
        }
    }

    /// Wrap `document` in a compilation and register it.
    pub fn initialize(&mut self, document: Document) -> bool {
        let name = document.name().to_string();
        self.fire(Action::PreInitialize, &name, None);
        let compilation = match self.spec.initializer() {
            Some(initializer) => initializer(&document),
            None => Compilation::new(document, "root", -1),
        };
        self.environment.insert(compilation);
        self.fire(Action::PostInitialize, &name, None);
        true
    }

    /// Grow the document's tree until no parser places anything new.
    pub fn parse(&mut self, name: &str) -> bool {
        self.fire(Action::PreParse, name, None);
        let Unit {
            spec, environment, ..
        } = self;
        let Some(compilation) = environment.get_mut(name) else {
            return false;
        };
        let parsers = spec.parsers();

        for round in 0.. {
            if round == MAX_ROUNDS {
                log::warn!("parsing {name} did not settle after {MAX_ROUNDS} rounds");
                break;
            }
            let mut placed = 0usize;
            for tree in compilation.trees().hierarchy(compilation.root()) {
                // ordered fallback: the first producing parser wins this
                // tree for this round
                let proposed = parsers
                    .iter()
                    .map(|parser| parser.parse(compilation, tree))
                    .find(|proposed| !proposed.is_empty())
                    .unwrap_or_default();
                for candidate in proposed {
                    match compilation.offer(tree, candidate) {
                        Ok(()) => placed += 1,
                        Err(cause) => {
                            log::debug!("dropping a parsed tree for {name}: {cause}");
                        }
                    }
                }
            }
            if placed == 0 {
                break;
            }
        }
        self.fire(Action::PostParse, name, None);
        true
    }

    /// Reshape the document's tree until a full pass changes nothing.
    pub fn analyze(&mut self, name: &str) -> bool {
        self.fire(Action::PreAnalyze, name, None);
        let Unit {
            spec, environment, ..
        } = self;
        let Some(compilation) = environment.get_mut(name) else {
            return false;
        };

        for processor in spec.pre_analyze_processors() {
            Self::settle(processor, compilation);
        }

        let analyzers = spec.analyzers();
        let root = compilation.root();
        for round in 0.. {
            if round == MAX_ROUNDS {
                log::warn!("analyzing {name} did not settle after {MAX_ROUNDS} rounds");
                break;
            }
            let mut changed = false;
            for analyzer in &analyzers {
                changed |= analyzer.analyze(compilation, root);
            }
            if !changed {
                break;
            }
        }
        self.fire(Action::PostAnalyze, name, None);
        true
    }

    /// Lower the document's tree to an instruction.
    pub fn compile(&mut self, name: &str) -> bool {
        self.fire(Action::PreCompile, name, None);
        let Unit {
            spec, environment, ..
        } = self;
        let Some(compilation) = environment.get_mut(name) else {
            return false;
        };

        for processor in spec.pre_compile_processors() {
            Self::settle(processor, compilation);
        }

        let dispatcher = Dispatcher {
            compilers: spec.compilers(),
        };
        let root = compilation.root();
        let document = compilation.document().clone();
        let root_reference = compilation.trees().reference(root);
        let outcome = dispatcher.compile(&dispatcher, compilation, root);
        let failure = match outcome {
            Ok(Some(instruction)) => {
                compilation.set_instruction(instruction);
                None
            }
            Ok(None) => Some((
                "no compiler handled the document root".to_string(),
                root_reference,
            )),
            Err(error) => Some((error.message, error.reference)),
        };
        let ok = failure.is_none();
        if let Some((message, reference)) = failure {
            self.environment
                .diagnose(Severity::Error, message, &document, Some(reference));
        }
        self.fire(Action::PostCompile, name, None);
        ok
    }

    /// Run the compiled instruction; the root frame's console becomes the
    /// document output.
    pub fn execute(&mut self, name: &str) -> bool {
        self.fire(Action::PreExecute, name, None);
        let Some(instruction) = self
            .environment
            .get(name)
            .and_then(|compilation| compilation.instruction().cloned())
        else {
            return false;
        };

        let mut memory = Memory::new();
        let outcome = instruction.exec(&mut self.environment, &mut memory);
        let ok = match outcome {
            Ok(()) => {
                let output = memory.console().to_string();
                if let Some(target) = memory.console_target() {
                    log::debug!("console target for {name}: {target}");
                }
                if let Some(compilation) = self.environment.get_mut(name) {
                    compilation.set_output(output);
                }
                true
            }
            Err(fault) => {
                let message = fault.cause.to_string();
                self.environment
                    .diagnose_at(Severity::Error, message, fault.location.as_ref());
                false
            }
        };
        self.fire(Action::PostExecute, name, Some(&memory));
        ok
    }

    /// Render the recorded diagnostics as text, one per line.
    pub fn diagnostic(&self) -> String {
        self.environment
            .diagnostics()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn settle(processor: &crate::spec::Processor, compilation: &mut Compilation) {
        for _ in 0..MAX_ROUNDS {
            if !processor(compilation) {
                return;
            }
        }
        log::warn!("a processor did not settle after {MAX_ROUNDS} rounds");
    }
}

/// The top-level compile dispatcher: first non-empty result wins.
#[derive(Debug)]
struct Dispatcher<'a> {
    compilers: Vec<&'a dyn Compiler>,
}

impl Compiler for Dispatcher<'_> {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        for compiler in &self.compilers {
            if let Some(instruction) = compiler.compile(root, compilation, tree)? {
                return Ok(Some(instruction));
            }
        }
        Ok(None)
    }
}
