use course_core::model::{CourseDraft, LessonDraft, ModuleDraft};

fn lesson(title: &str, order: u32, minutes: u32) -> LessonDraft {
    LessonDraft {
        id: None,
        title: title.into(),
        video_url: format!(
            "https://videos.example.com/{}.mp4",
            title.to_lowercase().replace(' ', "-")
        ),
        duration_minutes: minutes,
        order,
    }
}

fn module(title: &str, order: u32, lessons: Vec<LessonDraft>) -> ModuleDraft {
    ModuleDraft {
        title: title.into(),
        order,
        lessons,
    }
}

/// Demo catalog for the local backend.
pub fn sample_courses() -> Vec<CourseDraft> {
    let mut web = CourseDraft {
        title: "Full-Stack Web Foundations".into(),
        description: "HTML, CSS and JavaScript up to a deployed single-page app.".into(),
        instructor: "Grace Okafor".into(),
        price: 49.99,
        thumbnail: "https://img.example.com/web-foundations.png".into(),
        category: "Web Development".into(),
        modules: vec![
            module(
                "Getting Started",
                1,
                vec![lesson("How the web works", 1, 12), lesson("Tooling", 2, 9)],
            ),
            module(
                "JavaScript",
                2,
                vec![
                    lesson("Values and types", 1, 18),
                    lesson("Functions", 2, 21),
                    lesson("The DOM", 3, 25),
                ],
            ),
        ],
        ..CourseDraft::default()
    };
    web.set_tags("html, css, javascript");

    let mut data = CourseDraft {
        title: "Practical Data Analysis".into(),
        description: "Cleaning, exploring and visualizing real datasets.".into(),
        instructor: "Tomas Lindqvist".into(),
        price: 0.0,
        thumbnail: "https://img.example.com/data-analysis.png".into(),
        category: "Data Science".into(),
        modules: vec![module(
            "Exploration",
            1,
            vec![lesson("Loading data", 1, 14), lesson("Summaries", 2, 16)],
        )],
        ..CourseDraft::default()
    };
    data.set_tags("statistics, python");

    let mut design = CourseDraft {
        title: "Interface Design Basics".into(),
        description: "Layout, typography and color for product interfaces.".into(),
        instructor: "Mei Arai".into(),
        price: 19.0,
        thumbnail: "https://img.example.com/ui-design.png".into(),
        category: "Design".into(),
        modules: vec![
            module("Layout", 1, vec![lesson("Grids", 1, 11)]),
            module("Type", 2, vec![lesson("Hierarchy", 1, 13)]),
            module("Color", 3, vec![lesson("Palettes", 1, 10)]),
        ],
        ..CourseDraft::default()
    };
    design.set_tags("ui, figma");

    vec![web, data, design]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_drafts_validate() {
        for draft in sample_courses() {
            draft.validate().unwrap();
        }
    }
}
