use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Russian,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Russian => "ru",
        }
    }

    pub fn strings(self) -> &'static Strings {
        match self {
            Self::English => &ENGLISH,
            Self::Russian => &RUSSIAN,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "ru" | "russian" => Ok(Self::Russian),
            other => Err(format!("unsupported language `{other}` (expected `en` or `ru`)")),
        }
    }
}

/// Fixed text for one language: what the model is told, what the student
/// reads when the model fails, and the control labels.
#[derive(Debug)]
pub struct Strings {
    pub persona: &'static str,
    pub hint_instruction: &'static str,
    pub analysis_instruction: &'static str,
    pub hint_empty: &'static str,
    pub hint_failed: &'static str,
    pub analysis_empty: &'static str,
    pub analysis_failed: &'static str,
    pub student_follow_up: &'static str,

    pub app_title: &'static str,
    pub welcome_title: &'static str,
    pub welcome_blurb: &'static str,
    pub drop_photo: &'static str,
    pub drop_photo_hovered: &'static str,
    pub gallery_hint: &'static str,
    pub gallery_open: &'static str,
    pub loading_photo: &'static str,
    pub give_hint: &'static str,
    pub analysing: &'static str,
    pub my_solution: &'static str,
    pub tutor_thinking: &'static str,
    pub new_photo: &'static str,
    pub hint_did_not_help: &'static str,
    pub next_problem: &'static str,
    pub diagnostics: &'static str,
}

static ENGLISH: Strings = Strings {
    persona: "You are an experienced, wise, strict but fair school mathematics teacher.
Your goal is to teach the student to think, not simply to hand over the answer.
Address the student informally, as \"you\".
Style: supportive, pedagogical, structured.",
    hint_instruction: "Look at this photo of a solved problem. The student is asking for a hint. \
Do not give the full solution or the answer. Find the place where the student may have got stuck \
or made a mistake, and give a leading hint. If the solution looks correct, simply encourage the \
student and suggest re-checking the calculations.",
    analysis_instruction: "The hint did not help. Give a full review of the solution in the photo.
1. Check the course of the solution.
2. If there are mistakes, list them point by point. For each mistake explain WHY it is not allowed, referring to mathematical rules.
3. Write out the correct solution and the answer.
Use Markdown for formatting (bold text, lists).",
    hint_empty: "Sorry, I couldn't make out the solution. Try taking a clearer photo.",
    hint_failed: "Something went wrong while analysing the image. Please try again.",
    analysis_empty: "I couldn't put together a full review. Try uploading the photo again.",
    analysis_failed: "Something went wrong while composing the review. Please try later.",
    student_follow_up: "The hint didn't help. Where is the mistake?",

    app_title: "TutorLens",
    welcome_title: "Need help with maths?",
    welcome_blurb: "Take a photo of your solution. I'll give you a hint, and if you get stuck we'll go through the mistakes together.",
    drop_photo: "Drop a photo of your solution here",
    drop_photo_hovered: "Release to upload",
    gallery_hint: "or open one from your gallery (file path)",
    gallery_open: "Open",
    loading_photo: "Loading photo...",
    give_hint: "Give me a hint",
    analysing: "Analysing the solution...",
    my_solution: "My solution:",
    tutor_thinking: "The teacher is thinking...",
    new_photo: "New photo",
    hint_did_not_help: "The hint didn't help",
    next_problem: "Solve the next problem",
    diagnostics: "Diagnostics",
};

static RUSSIAN: Strings = Strings {
    persona: "Ты — опытный, мудрый, строгий, но справедливый школьный учитель математики.
Твоя цель — научить ученика мыслить, а не просто дать ответ.
Обращайся к ученику на \"ты\".
Стиль общения: поддерживающий, педагогический, структурированный.",
    hint_instruction: "Посмотри на это фото с решением задачи. Ученик просит подсказку. \
Не говори полное решение и ответ. Найди место, где ученик мог застрять или совершить ошибку, \
и дай наводящую подсказку. Если решение кажется верным, просто подбодри и предложи проверить вычисления.",
    analysis_instruction: "Подсказка не помогла. Проведи полный разбор решения на фото.
1. Проверь ход решения.
2. Если есть ошибки, выпиши их по пунктам. Для каждой ошибки объясни, ПОЧЕМУ так нельзя делать, ссылаясь на математические правила.
3. Напиши правильный ход решения и ответ.
Используй Markdown для форматирования (жирный шрифт, списки).",
    hint_empty: "Извини, я не смог разглядеть решение. Попробуй сделать фото четче.",
    hint_failed: "Произошла ошибка при анализе изображения. Попробуй еще раз.",
    analysis_empty: "Не удалось сформировать полный разбор. Попробуй загрузить фото заново.",
    analysis_failed: "Произошла ошибка при составлении разбора. Попробуй позже.",
    student_follow_up: "Подсказка не помогла. Где ошибка?",

    app_title: "TutorLens",
    welcome_title: "Нужна помощь с математикой?",
    welcome_blurb: "Сфотографируй свое решение. Я дам подсказку, а если запутаешься — разберем ошибки вместе.",
    drop_photo: "Перетащи сюда фото решения",
    drop_photo_hovered: "Отпусти, чтобы загрузить",
    gallery_hint: "или загрузи из галереи (путь к файлу)",
    gallery_open: "Открыть",
    loading_photo: "Загружаю фото...",
    give_hint: "Дать подсказку",
    analysing: "Анализирую решение...",
    my_solution: "Мое решение:",
    tutor_thinking: "Учитель думает...",
    new_photo: "Новое фото",
    hint_did_not_help: "Подсказка не помогла",
    next_problem: "Решить следующую задачу",
    diagnostics: "Диагностика",
};
