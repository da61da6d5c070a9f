use minijinja::Environment;
use serde::Serialize;

use crate::errors::WelcomeResult;

const GREETING: &str = "Hi ***{{ author }}***, welcome to the {{ community_name }} Community.
I'm the Bot here serving you. You can find the instructions on how to interact with me at **[Here]({{ command_link }})**.
If you have any questions, please contact the SIG: [{{ sig }}]({{ sig_link }})";

const MAINTAINERS: &str = r#"{% include "greeting" %}, and any of the maintainers: @{{ maintainers|join(" , @") }}"#;
const MAINTAINERS_AND_COMMITTERS: &str = r#"{% include "greeting" %}, and any of the maintainers: @{{ maintainers|join(" , @") }} or the committers: @{{ committers|join(" , @") }}"#;
const COMMITTERS: &str = r#"{% include "greeting" %}, and any of the committers: @{{ committers|join(" , @") }}"#;
const UNATTRIBUTED: &str = r#"{% include "greeting" %}, and any of the maintainers."#;

/// Values available to the welcome templates
#[derive(Debug, Serialize)]
pub struct WelcomeContext<'a> {
    pub author: &'a str,
    pub community_name: &'a str,
    pub command_link: &'a str,
    pub sig: &'a str,
    pub sig_link: &'a str,
    pub maintainers: &'a [String],
    pub committers: &'a [String],
}

impl WelcomeContext<'_> {
    fn template_name(&self) -> &'static str {
        match (self.maintainers.is_empty(), self.committers.is_empty()) {
            (false, true) => "maintainers",
            (false, false) => "maintainers_and_committers",
            (true, false) => "committers",
            (true, true) => "unattributed",
        }
    }
}

#[derive(Debug)]
pub struct WelcomeMessages {
    env: Environment<'static>,
}

impl WelcomeMessages {
    pub fn new() -> WelcomeResult<Self> {
        let mut env = Environment::new();
        env.add_template("greeting", GREETING)?;
        env.add_template("maintainers", MAINTAINERS)?;
        env.add_template("maintainers_and_committers", MAINTAINERS_AND_COMMITTERS)?;
        env.add_template("committers", COMMITTERS)?;
        env.add_template("unattributed", UNATTRIBUTED)?;

        Ok(Self { env })
    }

    pub fn render(&self, context: &WelcomeContext) -> WelcomeResult<String> {
        let template = self.env.get_template(context.template_name())?;
        Ok(template.render(context)?)
    }
}
