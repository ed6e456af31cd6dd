use crate::commands::{check, init, inspect, snapshot};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "init",
            groups: init::EXAMPLES,
        },
        CommandExample {
            name: "inspect",
            groups: inspect::EXAMPLES,
        },
        CommandExample {
            name: "check",
            groups: check::EXAMPLES,
        },
        CommandExample {
            name: "snapshot",
            groups: snapshot::EXAMPLES,
        },
    ]
}
