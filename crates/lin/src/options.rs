/// The control-state representation of the generated linear process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinMethod {
    /// Encode the continuation as a stack datatype; works for non-regular
    /// processes.
    Stack,
    /// Encode the continuation as a single state parameter.
    Regular,
    /// Like regular, but state values are generated lazily per sequence of
    /// process references that is actually reached.
    Regular2,
}

/// The strategy of the rewriter used to simplify conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RewriteStrategy {
    Innermost,
    #[default]
    Compact,
}

/// The configuration of a linearisation run.
#[derive(Clone, Debug)]
pub struct LinOptions {
    pub lin_method: LinMethod,
    /// Cluster the final result into one summand per action pattern.
    pub final_cluster: bool,
    /// Skip clustering inside the pipeline, trading summand count for speed.
    pub no_intermediate_cluster: bool,
    /// Use an enumerated state sort instead of positive numbers.
    pub newstate: bool,
    /// Use a tuple of boolean state parameters; overrides the enumerated
    /// encoding.
    pub binary: bool,
    /// Disable sum elimination.
    pub nosumelm: bool,
    /// Derive state constant names from the process names they represent.
    pub statenames: bool,
    /// Disable the rewriter during linearisation.
    pub norewrite: bool,
    /// Forbid free data variables in the result, declaring dummy constants
    /// instead.
    pub nofreevars: bool,
    /// Disable the collapse of subsumed delta summands.
    pub nodeltaelimination: bool,
    pub strategy: RewriteStrategy,
}

impl Default for LinOptions {
    fn default() -> Self {
        LinOptions {
            lin_method: LinMethod::Regular,
            final_cluster: false,
            no_intermediate_cluster: false,
            newstate: true,
            binary: false,
            nosumelm: false,
            statenames: false,
            norewrite: false,
            nofreevars: false,
            nodeltaelimination: false,
            strategy: RewriteStrategy::default(),
        }
    }
}

impl LinOptions {
    /// True iff a regular translation, without stacks, is requested.
    pub fn regular(&self) -> bool {
        self.lin_method != LinMethod::Stack
    }

    pub fn regular2(&self) -> bool {
        self.lin_method == LinMethod::Regular2
    }

    /// True iff the state parameter is a positive number instead of an
    /// enumerated sort.
    pub fn oldstate(&self) -> bool {
        !self.newstate
    }
}
