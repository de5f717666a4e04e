//! Canned evaluation questions and `medrag eval`.

use anyhow::{bail, Result};

use crate::ask::render_answer;
use crate::context::QueryContext;

/// The fixed evaluation question set, in presentation order.
pub static EVAL_QUESTIONS: [&str; 33] = [
    "What are the symptoms of allergic rhinitis?",
    "How to treat nasal allergies effectively?",
    "What is allergic rhinitis and its common triggers?",
    "Describe the procedure for laparoscopic gastric bypass.",
    "What are the complications of gastric bypass surgery?",
    "How much weight can be lost with laparoscopic gastric bypass?",
    "What is the recovery time for gastric bypass?",
    "What was found in the 2-D Echocardiogram?",
    "What are the signs of left atrial enlargement?",
    "Explain mitral regurgitation and its causes.",
    "What does an ejection fraction of 70% indicate?",
    "How is aortic valve stenosis treated?",
    "How is chronic kidney disease managed?",
    "What are the stages of kidney disease?",
    "How are electrolyte imbalances treated in kidney disease?",
    "What are the symptoms of migraine headaches?",
    "How is Bell's palsy diagnosed and treated?",
    "What causes peripheral neuropathy?",
    "What is the treatment for knee pain?",
    "How to manage lower back pain?",
    "What causes osteoarthritis?",
    "What is GERD and how is it treated?",
    "What causes peptic ulcers?",
    "How are gallstones managed?",
    "What is COPD and its risk factors?",
    "How is asthma managed?",
    "What causes shortness of breath?",
    "How is diabetes managed?",
    "What is thyroid disease?",
    "How is hypertension treated?",
    "What are the vital signs and their normal ranges?",
    "How is blood pressure measured?",
    "What does a physical examination include?",
];

/// Look up a question by its 1-based number as shown by `medrag questions`.
pub fn question_by_number(number: usize) -> Result<&'static str> {
    match number
        .checked_sub(1)
        .and_then(|i| EVAL_QUESTIONS.get(i).copied())
    {
        Some(q) => Ok(q),
        None => bail!(
            "question number must be between 1 and {}",
            EVAL_QUESTIONS.len()
        ),
    }
}

/// Print the numbered question list.
pub fn list_questions() {
    for (i, q) in EVAL_QUESTIONS.iter().enumerate() {
        println!("{:>3}. {}", i + 1, q);
    }
}

/// Run one question (by number) or the whole set.
///
/// A failed question is reported on stderr and the run moves on; the
/// command fails at the end if any question did.
pub async fn run_eval(ctx: &QueryContext, number: Option<usize>) -> Result<()> {
    let selected: Vec<(usize, &str)> = match number {
        Some(n) => vec![(n, question_by_number(n)?)],
        None => EVAL_QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, q)| (i + 1, *q))
            .collect(),
    };
    let pipeline = ctx.pipeline()?;

    let mut failures = 0usize;
    for (n, question) in &selected {
        println!("[{}] Question: {}", n, question);
        match pipeline.answer(question).await {
            Ok(answer) => println!("{}", render_answer(&answer)),
            Err(e) => {
                failures += 1;
                tracing::warn!(question = n, error = %e, "evaluation question failed");
                eprintln!("[{}] Error: {:#}", n, e);
                println!();
            }
        }
    }

    println!(
        "eval: {} answered, {} failed",
        selected.len() - failures,
        failures
    );
    if failures > 0 {
        bail!("{} of {} evaluation questions failed", failures, selected.len());
    }
    Ok(())
}
