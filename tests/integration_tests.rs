use assert_cmd::Command;

#[test]
fn test_cli_renders_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("jamplate")?;

    let assert = cmd.write_stdin("1 + 2 * (3 + 5)").assert();
    assert.success().code(0).stdout("17");

    Ok(())
}

#[test]
fn test_cli_renders_directives() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("jamplate")?;

    let assert = cmd
        .write_stdin("#for X [1,2,3]\nx=#{X}#\n#endfor")
        .assert();
    assert.success().code(0).stdout("x=1\nx=2\nx=3\n");

    Ok(())
}

#[test]
fn test_cli_applies_defines() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("jamplate")?;

    let assert = cmd
        .arg("-D")
        .arg("NAME=world")
        .write_stdin("hello #{NAME}#")
        .assert();
    assert.success().code(0).stdout("hello world");

    Ok(())
}

#[test]
fn test_cli_fails_on_unknown_commands() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("jamplate")?;

    let assert = cmd.write_stdin("#nonsense directive\n").assert();
    assert.failure();

    Ok(())
}

#[test]
fn test_cli_renders_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join("jamplate-cli-test");
    std::fs::create_dir_all(&dir)?;
    let input = dir.join("page.jp");
    std::fs::write(&input, "#declare A {k:'v'}\nvalue=#{A.k}#\n")?;

    let mut cmd = Command::cargo_bin("jamplate")?;
    let assert = cmd.arg(&input).assert();
    assert.success().stdout("value=v\n");

    std::fs::remove_file(input)?;
    Ok(())
}
