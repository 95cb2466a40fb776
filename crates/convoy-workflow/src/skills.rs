//! Skill prompt rendering and skill file writing

use crate::spec::Skill;
use convoy_core::{Error, Result};
use minijinja::{Environment, context};
use std::fs;
use std::path::Path;
use tracing::debug;

/// File every skill's source is collected into
pub const SKILLS_FILE: &str = "skills.py";

const SKILLS_PROMPT_TEMPLATE: &str = "\
While solving the task you may use the functions below, which are available in a file called skills.py.
To use a function from skills.py in code, import it from skills.py and then call it.
If you need to install python packages, write shell code to install them with pip using the --quiet option.
{% for skill in skills %}
##### Begin of {{ skill.title }} #####
{% if skill.description %}# {{ skill.description }}
{% endif %}```python
{{ skill.content }}
```
#### End of {{ skill.title }} ####
{% endfor %}";

/// Turns skills into a system-prompt fragment
pub trait SkillRenderer: Send + Sync {
    /// Render the prompt for `skills`, writing any files they need into `work_dir`
    ///
    /// The same skills must always render to the same prompt.
    fn render(&self, skills: &[Skill], work_dir: &Path) -> Result<String>;
}

/// Skill renderer backed by a minijinja template
///
/// Besides rendering the prompt it writes every skill's source into
/// `skills.py` in the work directory, plus a separate file for skills that
/// name one.
#[derive(Debug, Clone)]
pub struct JinjaSkillRenderer {
    template: String,
    write_files: bool,
}

impl JinjaSkillRenderer {
    /// Renderer using the built-in prompt template
    pub fn new() -> Self {
        Self {
            template: SKILLS_PROMPT_TEMPLATE.to_string(),
            write_files: true,
        }
    }

    /// Use a custom template; it receives a `skills` list
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Only render the prompt, never touch the work directory
    pub fn without_files(mut self) -> Self {
        self.write_files = false;
        self
    }

    fn write_files(&self, skills: &[Skill], work_dir: &Path) -> Result<()> {
        fs::create_dir_all(work_dir)?;

        let combined = skills
            .iter()
            .map(|skill| skill.content.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n\n");
        fs::write(work_dir.join(SKILLS_FILE), format!("{combined}\n"))?;

        for skill in skills {
            if let Some(file_name) = &skill.file_name {
                let target = Path::new(file_name)
                    .file_name()
                    .ok_or_else(|| Error::config(&skill.title, format!("invalid skill file name '{file_name}'")))?;
                fs::write(work_dir.join(target), &skill.content)?;
            }
        }

        debug!(skills = skills.len(), dir = %work_dir.display(), "Wrote skill files");
        Ok(())
    }
}

impl Default for JinjaSkillRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillRenderer for JinjaSkillRenderer {
    fn render(&self, skills: &[Skill], work_dir: &Path) -> Result<String> {
        if self.write_files {
            self.write_files(skills, work_dir)?;
        }

        let env = Environment::new();
        let prompt = env
            .render_str(&self.template, context! { skills => skills })
            .map_err(|e| Error::config("skills", format!("failed to render skills prompt: {e}")))?;
        Ok(prompt.trim_end().to_string())
    }
}
