use pixfix as px;

fn main() -> Result<(), px::Error> {
    let session = px::Session::builder()
        // every pixel of the reference brighter than the tolerance is masked
        .reference(&"imgs/ref.png")
        .tolerance(30)
        // grow the mask a little when the target is larger than the reference
        .strength(0.5)
        .build()?;

    // print each pass as it completes
    let mut progress = |update: px::PassUpdate<'_>| {
        println!(
            "pass {}: corrected {}, {} left (ksize {})",
            update.pass, update.corrected, update.remaining, update.ksize
        );
    };

    let treated = session.treat_with_progress(&"imgs/1.jpg", Some(&mut progress))?;

    //save the result to the disk
    treated.save("out/01.jpg")
}
