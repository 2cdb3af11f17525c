use pixfix as px;
use std::path::Path;

fn main() -> Result<(), px::Error> {
    let input = Path::new("imgs");
    let out_dir = input.join("treated");

    // the reference is the file named `ref.*`
    let reference = px::find_reference(input)?;

    let session = px::Session::builder()
        .reference(&reference)
        .strength(1.0)
        .build()?;

    session.save_visualization(&out_dir, "ref")?;

    let jobs: Vec<_> = px::collect_targets(input, &reference)?
        .into_iter()
        .map(|path| px::BatchJob::in_dir(path, &out_dir))
        .collect();

    for outcome in session.treat_batch(&jobs, None)? {
        if let Err(err) = outcome.result {
            eprintln!("{}: {}", outcome.job.input.display(), err);
        }
    }

    Ok(())
}
